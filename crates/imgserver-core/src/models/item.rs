use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

use super::{ImageFormat, Size};
use crate::error::AppError;

/// Consistency status shared by original and derived items.
///
/// `Inconsistent` covers the window between "record created" and "file durably written".
/// An item left `Inconsistent` with no writer in progress points at a crashed or delayed
/// producer; it is never treated as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "item_status", rename_all = "lowercase")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Inconsistent,
    Ok,
}

impl Display for ItemStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ItemStatus::Inconsistent => write!(f, "INCONSISTENT"),
            ItemStatus::Ok => write!(f, "OK"),
        }
    }
}

/// Record for an uploaded, unmodified source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OriginalItem {
    pub id: String,
    pub status: ItemStatus,
    pub size: Size,
    pub format: ImageFormat,
    pub updated_at: DateTime<Utc>,
}

impl OriginalItem {
    pub fn new(id: impl Into<String>, status: ItemStatus, size: Size, format: ImageFormat) -> Self {
        Self {
            id: id.into(),
            status,
            size,
            format,
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::Original(self.id.clone())
    }
}

/// Unique key of a derived item: which original, at what size, in what format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct DerivedKey {
    pub original_id: String,
    pub size: Size,
    pub format: ImageFormat,
}

impl DerivedKey {
    pub fn new(original_id: impl Into<String>, size: Size, format: ImageFormat) -> Self {
        Self {
            original_id: original_id.into(),
            size,
            format,
        }
    }
}

impl Display for DerivedKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}-{}/{}", self.original_id, self.size, self.format)
    }
}

/// Record for a resized and/or reformatted version of an original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DerivedItem {
    #[serde(flatten)]
    pub key: DerivedKey,
    pub status: ItemStatus,
    pub updated_at: DateTime<Utc>,
}

impl DerivedItem {
    pub fn new(key: DerivedKey, status: ItemStatus) -> Self {
        Self {
            key,
            status,
            updated_at: Utc::now(),
        }
    }
}

/// Addresses either kind of item for status updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Original(String),
    Derived(DerivedKey),
}

impl Display for ItemKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ItemKey::Original(id) => f.write_str(id),
            ItemKey::Derived(key) => key.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Original,
    Derived,
}

impl FromStr for ItemKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "original" => Ok(ItemKind::Original),
            "derived" => Ok(ItemKind::Derived),
            _ => Err(AppError::InvalidInput(format!(
                "Invalid item kind {:?}, expected original or derived",
                s
            ))),
        }
    }
}

impl Display for ItemKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ItemKind::Original => write!(f, "original"),
            ItemKind::Derived => write!(f, "derived"),
        }
    }
}

/// Either kind of item, as returned by inconsistency listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Item {
    Original(OriginalItem),
    Derived(DerivedItem),
}

impl Item {
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Original(_) => ItemKind::Original,
            Item::Derived(_) => ItemKind::Derived,
        }
    }

    pub fn key(&self) -> ItemKey {
        match self {
            Item::Original(item) => item.key(),
            Item::Derived(item) => ItemKey::Derived(item.key.clone()),
        }
    }

    pub fn status(&self) -> ItemStatus {
        match self {
            Item::Original(item) => item.status,
            Item::Derived(item) => item.status,
        }
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            Item::Original(item) => item.updated_at,
            Item::Derived(item) => item.updated_at,
        }
    }
}
