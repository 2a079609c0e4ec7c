//! Pixel-level image operations

pub mod resize;

pub use resize::ImageResize;
