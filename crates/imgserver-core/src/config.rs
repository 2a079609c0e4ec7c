//! Configuration module
//!
//! Settings are read from environment variables after loading a dotenv file. The file is
//! looked up in a fixed list of directories (see [`config_directories`]); real environment
//! variables always take precedence over its contents.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::models::AllowedSizes;

/// Environment variable naming the dotenv file to look for.
pub const CONFIG_FILE_ENV: &str = "IMGSERVER_CONFIG_FILE";
pub const DEFAULT_CONFIG_FILE_NAME: &str = "imgserver.env";

// Common constants
const DATA_DIRECTORY: &str = "./data";
const ALLOWED_SIZES: &str = "100x100,800x600";
const CONSISTENCY_MAX_RETRIES: u32 = 10;
const CONSISTENCY_RETRY_INTERVAL_MS: u64 = 1000;
const SERVER_PORT: u16 = 4000;
const MAX_UPLOAD_SIZE_MB: usize = 10;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Settings shared by the HTTP server and the admin CLI
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    pub log_format: String,
    pub max_upload_size_bytes: usize,
}

/// Image service configuration
#[derive(Clone, Debug)]
pub struct ImageServiceConfig {
    pub base: BaseConfig,
    pub data_directory: PathBuf,
    pub database_url: Option<String>,
    pub dev_mode: bool,
    pub allowed_sizes: AllowedSizes,
    pub consistency_max_retries: u32,
    pub consistency_retry_interval_ms: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ImageServiceConfig>);

impl Config {
    fn as_service(&self) -> &ImageServiceConfig {
        &self.0
    }

    /// Load the config file (if any) and read settings from the process environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let file_name =
            env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE_NAME.to_string());

        match locate_config_file(&file_name) {
            Some(path) => {
                dotenvy::from_path(&path).with_context(|| {
                    format!("Failed to load configuration file {}", path.display())
                })?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let max_upload_size_mb = lookup("MAX_UPLOAD_SIZE_MB")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let base = BaseConfig {
            server_port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(SERVER_PORT),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: lookup("DB_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
            log_format: lookup("LOG_FORMAT")
                .map(|v| v.trim().to_lowercase())
                .unwrap_or_else(|| "text".to_string()),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
        };

        let allowed_sizes_str = lookup("ALLOWED_SIZES").unwrap_or_else(|| ALLOWED_SIZES.to_string());
        let allowed_sizes = allowed_sizes_str
            .parse::<AllowedSizes>()
            .map_err(|e| anyhow::anyhow!("ALLOWED_SIZES is invalid: {}", e))?;

        let config = ImageServiceConfig {
            base,
            data_directory: PathBuf::from(
                lookup("DATA_DIRECTORY").unwrap_or_else(|| DATA_DIRECTORY.to_string()),
            ),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            dev_mode: lookup("DEV_MODE")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            allowed_sizes,
            consistency_max_retries: lookup("CONSISTENCY_MAX_RETRIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(CONSISTENCY_MAX_RETRIES),
            consistency_retry_interval_ms: lookup("CONSISTENCY_RETRY_INTERVAL_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(CONSISTENCY_RETRY_INTERVAL_MS),
        };

        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let config = self.as_service();

        if config.allowed_sizes.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_SIZES must list at least one size"));
        }

        if !config.dev_mode {
            match config.database_url.as_deref() {
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set unless DEV_MODE is enabled"
                    ));
                }
                Some(url) if !url.starts_with("postgres://") && !url.starts_with("postgresql://") => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ));
                }
                Some(_) => {}
            }
        }

        if !matches!(config.base.log_format.as_str(), "text" | "json") {
            return Err(anyhow::anyhow!(
                "LOG_FORMAT must be either 'text' or 'json', got '{}'",
                config.base.log_format
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.as_service().base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn data_directory(&self) -> &Path {
        &self.as_service().data_directory
    }

    pub fn database_url(&self) -> Option<&str> {
        self.as_service().database_url.as_deref()
    }

    pub fn dev_mode(&self) -> bool {
        self.as_service().dev_mode
    }

    pub fn allowed_sizes(&self) -> &AllowedSizes {
        &self.as_service().allowed_sizes
    }

    pub fn consistency_max_retries(&self) -> u32 {
        self.as_service().consistency_max_retries
    }

    pub fn consistency_retry_interval_ms(&self) -> u64 {
        self.as_service().consistency_retry_interval_ms
    }

    pub fn server_port(&self) -> u16 {
        self.as_service().base.server_port
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.as_service().base.max_upload_size_bytes
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_service().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_service().base.db_timeout_seconds
    }

    pub fn environment(&self) -> &str {
        &self.as_service().base.environment
    }

    pub fn log_format(&self) -> &str {
        &self.as_service().base.log_format
    }
}

/// Directories searched for the config file, in priority order.
pub fn config_directories(current_dir: Option<&Path>, exe_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(cwd) = current_dir {
        dirs.push(cwd.join("etc"));
        dirs.push(cwd.to_path_buf());
    }
    if let Some(exe) = exe_dir {
        dirs.push(exe.to_path_buf());
        dirs.push(exe.join("etc"));
    }
    dirs.push(PathBuf::from("/etc/imgserver"));
    dirs.push(PathBuf::from("/opt/local/etc/imgserver"));
    dirs
}

/// Return the first existing `file_name` among [`config_directories`].
pub fn locate_config_file(file_name: &str) -> Option<PathBuf> {
    let current_dir = env::current_dir().ok();
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));

    find_in_directories(
        file_name,
        &config_directories(current_dir.as_deref(), exe_dir.as_deref()),
    )
}

fn find_in_directories(file_name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(file_name))
        .find(|candidate| candidate.is_file())
}
