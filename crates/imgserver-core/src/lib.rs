//! imgserver core library
//!
//! This crate provides the domain models, error types, configuration and validation
//! shared by every imgserver component.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{locate_config_file, Config, CONFIG_FILE_ENV, DEFAULT_CONFIG_FILE_NAME};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    AllowedSizes, DerivedItem, DerivedKey, ImageFormat, Item, ItemKey, ItemKind, ItemStatus,
    OriginalItem, Size, TransformationRequest,
};
pub use validation::validate_image_id;
