//! In-memory item repository for dev mode and tests.

use async_trait::async_trait;
use chrono::Utc;
use imgserver_core::models::{
    DerivedItem, DerivedKey, Item, ItemKey, ItemKind, ItemStatus, OriginalItem,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::{StoreError, StoreResult};
use super::repository::ItemRepository;

#[derive(Default)]
struct Tables {
    originals: HashMap<String, OriginalItem>,
    derived: HashMap<DerivedKey, DerivedItem>,
}

/// Item repository held in process memory.
///
/// Both tables sit behind a single lock, so key checks and inserts are atomic the same
/// way a unique constraint makes them atomic in PostgreSQL.
#[derive(Clone, Default)]
pub struct MemoryItemRepository {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryItemRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemRepository for MemoryItemRepository {
    async fn create_original(&self, item: &OriginalItem) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.originals.contains_key(&item.id) {
            return Err(StoreError::DuplicateKey(item.id.clone()));
        }
        tables.originals.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn create_derived(&self, item: &DerivedItem) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.originals.contains_key(&item.key.original_id) {
            return Err(StoreError::NotFound(item.key.original_id.clone()));
        }
        if tables.derived.contains_key(&item.key) {
            return Err(StoreError::DuplicateKey(item.key.to_string()));
        }
        tables.derived.insert(item.key.clone(), item.clone());
        Ok(())
    }

    async fn update_status(&self, key: &ItemKey, status: ItemStatus) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        match key {
            ItemKey::Original(id) => {
                let item = tables
                    .originals
                    .get_mut(id)
                    .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
                item.status = status;
                item.updated_at = now;
            }
            ItemKey::Derived(derived_key) => {
                let item = tables
                    .derived
                    .get_mut(derived_key)
                    .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
                item.status = status;
                item.updated_at = now;
            }
        }
        Ok(())
    }

    async fn find_original_by_id(&self, id: &str) -> StoreResult<Option<OriginalItem>> {
        Ok(self.tables.read().await.originals.get(id).cloned())
    }

    async fn find_derived_by_key(&self, key: &DerivedKey) -> StoreResult<Option<DerivedItem>> {
        Ok(self.tables.read().await.derived.get(key).cloned())
    }

    async fn list_inconsistent(
        &self,
        kind: Option<ItemKind>,
        limit: usize,
    ) -> StoreResult<Vec<Item>> {
        let tables = self.tables.read().await;
        let mut items: Vec<Item> = Vec::new();

        if kind != Some(ItemKind::Derived) {
            items.extend(
                tables
                    .originals
                    .values()
                    .filter(|i| i.status == ItemStatus::Inconsistent)
                    .cloned()
                    .map(Item::Original),
            );
        }
        if kind != Some(ItemKind::Original) {
            items.extend(
                tables
                    .derived
                    .values()
                    .filter(|i| i.status == ItemStatus::Inconsistent)
                    .cloned()
                    .map(Item::Derived),
            );
        }

        items.sort_by_key(Item::updated_at);
        items.truncate(limit);
        Ok(items)
    }

    async fn delete_original(&self, id: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let existed = tables.originals.remove(id).is_some();
        tables.derived.retain(|key, _| key.original_id != id);
        Ok(existed)
    }

    async fn list_derived_for_original(&self, id: &str) -> StoreResult<Vec<DerivedItem>> {
        let tables = self.tables.read().await;
        let mut items: Vec<DerivedItem> = tables
            .derived
            .values()
            .filter(|i| i.key.original_id == id)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            (a.key.size, a.key.format.canonical_name())
                .cmp(&(b.key.size, b.key.format.canonical_name()))
        });
        Ok(items)
    }
}
