//! imgserver request engine
//!
//! This crate hosts the request processor: saving originals, and turning transformation
//! requests into cached derived files with at most one producer per derived key. The
//! item store's unique key is the only lock; concurrent requesters that lose the race
//! poll the store until the winner marks the item consistent. The HTTP and CLI crates
//! depend on this facade and on nothing below it for request handling.

pub mod authorization;
pub mod consistency;
pub mod factory;
pub mod paths;
pub mod processor;

#[cfg(test)]
pub(crate) mod testing;

pub use authorization::SizeAuthorization;
pub use consistency::{wait_for_status_ok, ConsistencyPolicy, WaitOutcome};
pub use factory::{assemble, build_image_service, ImageService};
pub use paths::{CachePath, CachePathResolver, CACHE_DIRECTORY, ORIGINAL_DIRECTORY};
pub use processor::{ImageRequestProcessor, ProcessorConfig, TransformationService};
