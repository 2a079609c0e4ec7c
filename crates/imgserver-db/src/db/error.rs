//! Error types for item store operations

use imgserver_core::AppError;
use thiserror::Error;

/// PostgreSQL SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";
/// PostgreSQL SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A record with the same key already exists. This is the signal the optimistic
    /// create protocol relies on, so it must stay distinguishable from other failures.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Item not found: {0}")]
    NotFound(String),

    /// A stored row could not be mapped back to a domain value
    #[error("Corrupt record {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    /// Width or height too large for the INTEGER columns
    #[error("Dimension {0} exceeds the item store range")]
    DimensionOutOfRange(u32),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Classify a failed INSERT: constraint violations become typed errors for `key`.
    pub fn from_insert(err: sqlx::Error, key: impl Into<String>) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() || db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
            {
                return StoreError::DuplicateKey(key.into());
            }
            if db_err.is_foreign_key_violation()
                || db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION)
            {
                return StoreError::NotFound(key.into());
            }
        }
        StoreError::Database(err)
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey(_))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(key) => AppError::DuplicateIdentifier(key),
            StoreError::NotFound(key) => AppError::OriginalNotFound(key),
            StoreError::DimensionOutOfRange(value) => {
                AppError::InvalidInput(format!("Dimension {} is too large", value))
            }
            StoreError::CorruptRecord { key, reason } => {
                AppError::Internal(format!("Corrupt record {}: {}", key, reason))
            }
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}
