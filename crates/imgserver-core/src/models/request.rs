use serde::Serialize;

use super::{DerivedKey, ImageFormat, Size};
use crate::error::AppError;
use crate::validation::validate_image_id;

/// Parameters of an image transformation request.
///
/// Can only be built from a valid image identifier, so the id is safe to use in file names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformationRequest {
    image_id: String,
    size: Size,
    format: ImageFormat,
}

impl TransformationRequest {
    pub fn new(image_id: impl Into<String>, size: Size, format: ImageFormat) -> Result<Self, AppError> {
        let image_id = image_id.into();
        validate_image_id(&image_id)?;
        if let Some(max) = format.max_dimension() {
            if size.width > max || size.height > max {
                return Err(AppError::InvalidInput(format!(
                    "{} images are limited to {}x{}, got {}",
                    format, max, max, size
                )));
            }
        }
        Ok(Self {
            image_id,
            size,
            format,
        })
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn derived_key(&self) -> DerivedKey {
        DerivedKey::new(self.image_id.clone(), self.size, self.format)
    }
}
