//! Data models for the image server
//!
//! Original and derived item records, the consistency status they share, and the
//! value types (sizes, formats, requests) used to address them.

mod format;
mod item;
mod request;
mod size;

pub use format::ImageFormat;
pub use item::{DerivedItem, DerivedKey, Item, ItemKey, ItemKind, ItemStatus, OriginalItem};
pub use request::TransformationRequest;
pub use size::{AllowedSizes, Size};
