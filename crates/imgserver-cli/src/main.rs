//! imgserver admin CLI: import originals, list inconsistent items, delete originals.
//!
//! Reads the same configuration as the API server (`IMGSERVER_CONFIG_FILE`, `DATABASE_URL`,
//! `DATA_DIRECTORY`, ...).

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use imgserver_cli::{init_tracing, render_items, OutputFormat};
use imgserver_core::{Config, ItemKind};
use imgserver_engine::build_image_service;

#[derive(Parser)]
#[command(name = "imgserver-cli", about = "imgserver administration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a local image file as a new original
    Import {
        /// Identifier for the original (ASCII letters and digits)
        #[arg(long)]
        id: String,
        /// Path to the image file
        #[arg(long)]
        file: PathBuf,
    },
    /// List items whose file was never confirmed written
    Inconsistent {
        /// Restrict to one kind: original or derived
        #[arg(long)]
        kind: Option<ItemKind>,
        /// Maximum number of items
        #[arg(long, default_value = "100")]
        limit: usize,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Delete an original together with its derived files and records
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.validate().context("Configuration validation failed")?;
    let service = build_image_service(&config).await?;
    let processor = &service.processor;

    match cli.command {
        Commands::Import { id, file } => {
            let item = processor
                .save_original(&file, &id)
                .await
                .with_context(|| format!("Failed to import {} as {}", file.display(), id))?;
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
        Commands::Inconsistent {
            kind,
            limit,
            format,
        } => {
            let items = processor
                .list_inconsistent(kind, limit)
                .await
                .context("Failed to list inconsistent items")?;
            println!("{}", render_items(&items, format)?);
        }
        Commands::Delete { id } => {
            let deleted = processor
                .delete_original(&id)
                .await
                .with_context(|| format!("Failed to delete {}", id))?;
            if !deleted {
                anyhow::bail!("Original not found: {}", id);
            }
            println!("Deleted original {}", id);
        }
    }

    Ok(())
}
