//! imgserver persistence layer
//!
//! Item records for originals and derived images, behind the [`ItemRepository`] trait.
//! The PostgreSQL implementation backs production deployments; the in-memory one serves
//! dev mode and tests with the same uniqueness contract.

pub mod db;

pub use db::{
    setup_database, ItemRepository, MemoryItemRepository, PgItemRepository, StoreError,
    StoreResult,
};
