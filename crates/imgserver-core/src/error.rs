//! Error types
//!
//! All failures surfaced by the image server are unified under the `AppError` enum.
//! Lower layers (item store, codec) have their own error types which convert into
//! `AppError` at the crate boundary.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::models::Size;

/// Level at which a failed request is logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Caller mistakes such as bad identifiers or unknown originals
    Debug,
    /// Policy rejections and unreadable uploads
    Warn,
    /// Store, codec and filesystem failures
    Error,
}

/// How an error presents itself to HTTP clients and to the logs.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Stable code clients can match on (e.g. `"DUPLICATE_IDENTIFIER"`)
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same request may succeed
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to show to clients
    fn client_message(&self) -> String;

    /// Sensitive errors never expose their details in responses
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("ID contains non alpha numeric characters: {0:?}")]
    InvalidIdentifier(String),

    #[error("Image file not recognized: {0}")]
    UnrecognizedImageFile(String),

    #[error("An image with the given ID already exists in the repository: {0}")]
    DuplicateIdentifier(String),

    #[error("Original image not found: {0}")]
    OriginalNotFound(String),

    #[error("Size not authorized: {0}")]
    SizeNotAuthorized(Size),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("IO failure: {0}")]
    Io(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidIdentifier(_) => (
            400,
            "INVALID_IDENTIFIER",
            false,
            Some("Use an identifier made of ASCII letters and digits only"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnrecognizedImageFile(_) => (
            400,
            "UNRECOGNIZED_IMAGE_FILE",
            false,
            Some("Check image format and try a different file"),
            false,
            LogLevel::Warn,
        ),
        AppError::DuplicateIdentifier(_) => (
            409,
            "DUPLICATE_IDENTIFIER",
            false,
            Some("Choose another identifier; originals are never overwritten"),
            false,
            LogLevel::Debug,
        ),
        AppError::OriginalNotFound(_) => (
            404,
            "ORIGINAL_NOT_FOUND",
            false,
            Some("Upload the original image before requesting derivatives"),
            false,
            LogLevel::Debug,
        ),
        AppError::SizeNotAuthorized(_) => (
            403,
            "SIZE_NOT_AUTHORIZED",
            false,
            Some("Request one of the configured sizes"),
            false,
            LogLevel::Warn,
        ),
        AppError::UnsupportedFormat(_) => (
            400,
            "UNSUPPORTED_FORMAT",
            false,
            Some("Use one of JPEG, PNG, GIF, BMP, TIFF, WEBP, ICO"),
            false,
            LogLevel::Debug,
        ),
        AppError::ImageProcessing(_) => (
            500,
            "IMAGE_PROCESSING_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Io(_) => (
            500,
            "IO_FAILURE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::InvalidIdentifier(_) => "InvalidIdentifier",
            AppError::UnrecognizedImageFile(_) => "UnrecognizedImageFile",
            AppError::DuplicateIdentifier(_) => "DuplicateIdentifier",
            AppError::OriginalNotFound(_) => "OriginalNotFound",
            AppError::SizeNotAuthorized(_) => "SizeNotAuthorized",
            AppError::UnsupportedFormat(_) => "UnsupportedFormat",
            AppError::ImageProcessing(_) => "ImageProcessing",
            AppError::Io(_) => "Io",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::ImageProcessing(_) => "Failed to process image".to_string(),
            AppError::Io(_) => "Failed to access image files".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::SizeNotAuthorized(size) => format!("Size {} is not authorized", size),
            other => other.to_string(),
        }
    }
}
