use imgserver_core::{AppError, ImageFormat};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised by image codecs
#[derive(Error, Debug)]
pub enum CodecError {
    /// The file cannot be read or is not an image in a supported format
    #[error("Unreadable image {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// The header was readable but the pixel data does not decode
    #[error("Corrupt image data: {0}")]
    Corrupt(String),

    #[error("Cannot encode image as {format}: {reason}")]
    Encode { format: ImageFormat, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CodecError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CodecError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the input itself is not a usable image.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, CodecError::Unreadable { .. } | CodecError::Corrupt(_))
    }
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Unreadable { .. } | CodecError::Corrupt(_) => {
                AppError::UnrecognizedImageFile(err.to_string())
            }
            CodecError::Encode { .. } => AppError::ImageProcessing(err.to_string()),
            CodecError::Io { .. } => AppError::Io(err.to_string()),
        }
    }
}
