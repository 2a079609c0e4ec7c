pub mod derived;
pub mod originals;
