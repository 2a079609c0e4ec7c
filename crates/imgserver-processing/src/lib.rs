//! imgserver image processing
//!
//! The [`ImageCodec`] capability (open, verify, crop-to-fit, save) and its implementation
//! on top of the `image` crate, plus atomic file publication shared with the engine.

pub mod codec;
pub mod error;
pub mod image;
pub mod publish;

pub use codec::{ImageCodec, ImageHandle, ImageRsCodec};
pub use error::{CodecError, CodecResult};
pub use publish::{copy_atomic, write_atomic};
