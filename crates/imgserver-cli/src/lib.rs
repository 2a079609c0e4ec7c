//! Shared helpers for the imgserver admin CLI.

use clap::ValueEnum;
use imgserver_core::Item;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Initialize tracing for the CLI: `RUST_LOG` or `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Serialize)]
struct InconsistentReport<'a> {
    count: usize,
    items: &'a [Item],
}

/// Render an inconsistency listing for stdout.
pub fn render_items(items: &[Item], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&InconsistentReport {
            count: items.len(),
            items,
        })?),
        OutputFormat::Table => Ok(render_table(items)),
    }
}

fn render_table(items: &[Item]) -> String {
    let mut out = String::from("\n=== Inconsistent Items ===\n");

    if items.is_empty() {
        out.push_str("\nNo inconsistent items found.\n");
        return out;
    }

    out.push_str(&format!(
        "\n{:<9} {:<48} {:<13} {:>20}\n",
        "Kind", "Key", "Status", "Updated At"
    ));
    out.push_str(&"-".repeat(93));
    out.push('\n');

    for item in items {
        out.push_str(&format!(
            "{:<9} {:<48} {:<13} {:>20}\n",
            item.kind().to_string(),
            truncate_string(&item.key().to_string(), 48),
            item.status().to_string(),
            item.updated_at().format("%Y-%m-%d %H:%M:%S")
        ));
    }

    out.push_str(&format!("\nTotal: {} items\n", items.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgserver_core::{
        DerivedItem, DerivedKey, ImageFormat, ItemStatus, OriginalItem, Size,
    };

    fn sample_items() -> Vec<Item> {
        let size = Size::new(100, 100).unwrap();
        vec![
            Item::Original(OriginalItem::new(
                "sami1",
                ItemStatus::Inconsistent,
                Size::new(200, 100).unwrap(),
                ImageFormat::Jpeg,
            )),
            Item::Derived(DerivedItem::new(
                DerivedKey::new("sami1", size, ImageFormat::Png),
                ItemStatus::Inconsistent,
            )),
        ]
    }

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn table_lists_each_item() {
        let out = render_items(&sample_items(), OutputFormat::Table).unwrap();
        assert!(out.contains("original"));
        assert!(out.contains("sami1-100x100/PNG"));
        assert!(out.contains("INCONSISTENT"));
        assert!(out.contains("Total: 2 items"));
    }

    #[test]
    fn table_reports_empty_listing() {
        let out = render_items(&[], OutputFormat::Table).unwrap();
        assert!(out.contains("No inconsistent items found."));
    }

    #[test]
    fn json_output_is_tagged_by_kind() {
        let out = render_items(&sample_items(), OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["count"], 2);
        assert_eq!(json["items"][0]["kind"], "original");
        assert_eq!(json["items"][1]["kind"], "derived");
        assert_eq!(json["items"][1]["original_id"], "sami1");
        assert_eq!(json["items"][1]["status"], "INCONSISTENT");
    }
}
