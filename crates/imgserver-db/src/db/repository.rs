use async_trait::async_trait;
use imgserver_core::models::{
    DerivedItem, DerivedKey, Item, ItemKey, ItemKind, ItemStatus, OriginalItem,
};

use super::error::StoreResult;

/// Durable records for original and derived images.
///
/// `create_*` must be atomic with respect to the record key and fail with
/// [`StoreError::DuplicateKey`](super::StoreError::DuplicateKey) when the key already
/// exists. That uniqueness is the only synchronization between concurrent producers.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn create_original(&self, item: &OriginalItem) -> StoreResult<()>;

    /// Fails with `NotFound` if the referenced original does not exist.
    async fn create_derived(&self, item: &DerivedItem) -> StoreResult<()>;

    async fn update_status(&self, key: &ItemKey, status: ItemStatus) -> StoreResult<()>;

    async fn find_original_by_id(&self, id: &str) -> StoreResult<Option<OriginalItem>>;

    async fn find_derived_by_key(&self, key: &DerivedKey) -> StoreResult<Option<DerivedItem>>;

    /// Items still `Inconsistent`, oldest first. `kind = None` lists both kinds.
    async fn list_inconsistent(&self, kind: Option<ItemKind>, limit: usize)
        -> StoreResult<Vec<Item>>;

    /// Delete an original and its derived records. Returns whether the original existed.
    async fn delete_original(&self, id: &str) -> StoreResult<bool>;

    /// Derived records of one original, any status.
    async fn list_derived_for_original(&self, id: &str) -> StoreResult<Vec<DerivedItem>>;

    /// Current status of an item, `None` if the record does not exist.
    async fn find_status(&self, key: &ItemKey) -> StoreResult<Option<ItemStatus>> {
        match key {
            ItemKey::Original(id) => Ok(self.find_original_by_id(id).await?.map(|i| i.status)),
            ItemKey::Derived(key) => Ok(self.find_derived_by_key(key).await?.map(|i| i.status)),
        }
    }
}
