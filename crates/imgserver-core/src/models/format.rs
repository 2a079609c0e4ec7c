use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::AppError;

/// Canonical names whose file extension differs from the lower-cased name.
const FORMAT_EXTENSIONS: &[(ImageFormat, &str)] = &[(ImageFormat::Jpeg, "jpg")];

/// Canonical image format tag.
///
/// Stored and serialized by its canonical upper-case name (`JPEG`, `PNG`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    WebP,
    Ico,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 7] = [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Gif,
        ImageFormat::Bmp,
        ImageFormat::Tiff,
        ImageFormat::WebP,
        ImageFormat::Ico,
    ];

    pub fn canonical_name(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
            ImageFormat::Gif => "GIF",
            ImageFormat::Bmp => "BMP",
            ImageFormat::Tiff => "TIFF",
            ImageFormat::WebP => "WEBP",
            ImageFormat::Ico => "ICO",
        }
    }

    /// File extension used in original and cache file names.
    ///
    /// Part of the persisted file naming contract: changing it orphans existing cache files.
    pub fn extension(&self) -> String {
        FORMAT_EXTENSIONS
            .iter()
            .find(|(format, _)| format == self)
            .map(|(_, ext)| ext.to_string())
            .unwrap_or_else(|| self.canonical_name().to_lowercase())
    }

    /// Largest width or height the format can encode, if it has a limit.
    pub fn max_dimension(&self) -> Option<u32> {
        match self {
            ImageFormat::Ico => Some(256),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Ico => "image/x-icon",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "JPEG" | "JPG" => Ok(ImageFormat::Jpeg),
            "PNG" => Ok(ImageFormat::Png),
            "GIF" => Ok(ImageFormat::Gif),
            "BMP" => Ok(ImageFormat::Bmp),
            "TIFF" | "TIF" => Ok(ImageFormat::Tiff),
            "WEBP" => Ok(ImageFormat::WebP),
            "ICO" => Ok(ImageFormat::Ico),
            _ => Err(AppError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.canonical_name())
    }
}
