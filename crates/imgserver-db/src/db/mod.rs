//! Database repositories for item records
//
// Repository contract and store errors
pub mod error;
pub mod repository;
//
// Implementations
pub mod item;
pub mod memory;
//
// Pool and migrations
pub mod setup;

pub use error::{StoreError, StoreResult};
pub use item::PgItemRepository;
pub use memory::MemoryItemRepository;
pub use repository::ItemRepository;
pub use setup::setup_database;
