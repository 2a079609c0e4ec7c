use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::AppError;

/// Image dimensions in pixels. Both sides are strictly positive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    /// Largest width or height the item store can hold.
    pub const MAX_DIMENSION: u32 = i32::MAX as u32;

    pub fn new(width: u32, height: u32) -> Result<Self, AppError> {
        if width == 0 || height == 0 {
            return Err(AppError::InvalidInput(format!(
                "Image dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        if width > Self::MAX_DIMENSION || height > Self::MAX_DIMENSION {
            return Err(AppError::InvalidInput(format!(
                "Image dimensions must not exceed {}, got {}x{}",
                Self::MAX_DIMENSION,
                width,
                height
            )));
        }
        Ok(Size { width, height })
    }
}

impl From<Size> for (u32, u32) {
    fn from(size: Size) -> Self {
        (size.width, size.height)
    }
}

impl FromStr for Size {
    type Err = AppError;

    /// Parse dimensions from the `WxH` form used in URLs and configuration.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .trim()
            .split_once('x')
            .ok_or_else(|| AppError::InvalidInput(format!("Invalid size {:?}, expected WxH", s)))?;

        let width = width
            .parse::<u32>()
            .map_err(|_| AppError::InvalidInput(format!("Invalid width: {:?}", width)))?;
        let height = height
            .parse::<u32>()
            .map_err(|_| AppError::InvalidInput(format!("Invalid height: {:?}", height)))?;

        Size::new(width, height)
    }
}

impl Display for Size {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Allow-list of sizes that transformation requests may ask for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllowedSizes(BTreeSet<Size>);

impl AllowedSizes {
    pub fn new(sizes: impl IntoIterator<Item = Size>) -> Self {
        AllowedSizes(sizes.into_iter().collect())
    }

    pub fn contains(&self, size: &Size) -> bool {
        self.0.contains(size)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Size> {
        self.0.iter()
    }
}

impl FromStr for AllowedSizes {
    type Err = AppError;

    /// Parse a comma-separated list such as `100x100,800x600`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Size::from_str)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(AllowedSizes)
    }
}

impl Display for AllowedSizes {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let parts: Vec<String> = self.0.iter().map(Size::to_string).collect();
        f.write_str(&parts.join(","))
    }
}
