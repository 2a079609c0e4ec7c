//! Validation of externally supplied values
//!
//! Image identifiers end up in file names, so they are checked before any store or
//! filesystem access.

use crate::error::AppError;

/// Accept an image identifier iff it is non-empty and made of ASCII letters and digits only.
pub fn validate_image_id(id: &str) -> Result<(), AppError> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}
