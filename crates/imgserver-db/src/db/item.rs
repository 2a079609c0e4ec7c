//! PostgreSQL item repository: original_item and derived_item tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use imgserver_core::models::{
    DerivedItem, DerivedKey, ImageFormat, Item, ItemKey, ItemKind, ItemStatus, OriginalItem, Size,
};
use sqlx::{PgPool, Postgres};

use super::error::{StoreError, StoreResult};
use super::repository::ItemRepository;

/// Row type for original_item table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct OriginalItemRow {
    pub id: String,
    pub status: ItemStatus,
    pub width: i32,
    pub height: i32,
    pub format: String,
    pub updated_at: DateTime<Utc>,
}

impl OriginalItemRow {
    pub fn to_original_item(self) -> StoreResult<OriginalItem> {
        let size = row_size(&self.id, self.width, self.height)?;
        let format = row_format(&self.id, &self.format)?;
        Ok(OriginalItem {
            id: self.id,
            status: self.status,
            size,
            format,
            updated_at: self.updated_at,
        })
    }
}

/// Row type for derived_item table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct DerivedItemRow {
    pub original_item_id: String,
    pub status: ItemStatus,
    pub width: i32,
    pub height: i32,
    pub format: String,
    pub updated_at: DateTime<Utc>,
}

impl DerivedItemRow {
    pub fn to_derived_item(self) -> StoreResult<DerivedItem> {
        let size = row_size(&self.original_item_id, self.width, self.height)?;
        let format = row_format(&self.original_item_id, &self.format)?;
        Ok(DerivedItem {
            key: DerivedKey::new(self.original_item_id, size, format),
            status: self.status,
            updated_at: self.updated_at,
        })
    }
}

fn row_size(key: &str, width: i32, height: i32) -> StoreResult<Size> {
    let corrupt = || StoreError::CorruptRecord {
        key: key.to_string(),
        reason: format!("invalid dimensions {}x{}", width, height),
    };
    let width = u32::try_from(width).map_err(|_| corrupt())?;
    let height = u32::try_from(height).map_err(|_| corrupt())?;
    Size::new(width, height).map_err(|_| corrupt())
}

fn row_format(key: &str, format: &str) -> StoreResult<ImageFormat> {
    format
        .parse::<ImageFormat>()
        .map_err(|_| StoreError::CorruptRecord {
            key: key.to_string(),
            reason: format!("unknown format {:?}", format),
        })
}

fn dimension(value: u32) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::DimensionOutOfRange(value))
}

/// Repository for original_item and derived_item tables.
#[derive(Clone)]
pub struct PgItemRepository {
    pool: PgPool,
}

impl PgItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_inconsistent_originals(&self, limit: i64) -> StoreResult<Vec<Item>> {
        let rows = sqlx::query_as::<Postgres, OriginalItemRow>(
            r#"
            SELECT id, status, width, height, format, updated_at
            FROM original_item
            WHERE status = 'inconsistent'
            ORDER BY updated_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| r.to_original_item().map(Item::Original))
            .collect()
    }

    async fn list_inconsistent_derived(&self, limit: i64) -> StoreResult<Vec<Item>> {
        let rows = sqlx::query_as::<Postgres, DerivedItemRow>(
            r#"
            SELECT original_item_id, status, width, height, format, updated_at
            FROM derived_item
            WHERE status = 'inconsistent'
            ORDER BY updated_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| r.to_derived_item().map(Item::Derived))
            .collect()
    }
}

#[async_trait]
impl ItemRepository for PgItemRepository {
    #[tracing::instrument(skip(self, item), fields(db.table = "original_item", db.operation = "insert", db.record_id = %item.id))]
    async fn create_original(&self, item: &OriginalItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO original_item (id, status, width, height, format, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&item.id)
        .bind(item.status)
        .bind(dimension(item.size.width)?)
        .bind(dimension(item.size.height)?)
        .bind(item.format.canonical_name())
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_insert(e, item.id.clone()))?;

        Ok(())
    }

    #[tracing::instrument(skip(self, item), fields(db.table = "derived_item", db.operation = "insert", db.record_id = %item.key))]
    async fn create_derived(&self, item: &DerivedItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO derived_item (original_item_id, status, width, height, format, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&item.key.original_id)
        .bind(item.status)
        .bind(dimension(item.key.size.width)?)
        .bind(dimension(item.key.size.height)?)
        .bind(item.key.format.canonical_name())
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_insert(e, item.key.to_string()))?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.operation = "update", db.record_id = %key))]
    async fn update_status(&self, key: &ItemKey, status: ItemStatus) -> StoreResult<()> {
        let result = match key {
            ItemKey::Original(id) => {
                sqlx::query(
                    "UPDATE original_item SET status = $1, updated_at = NOW() WHERE id = $2",
                )
                .bind(status)
                .bind(id)
                .execute(&self.pool)
                .await?
            }
            ItemKey::Derived(key) => {
                sqlx::query(
                    r#"
                    UPDATE derived_item SET status = $1, updated_at = NOW()
                    WHERE original_item_id = $2 AND width = $3 AND height = $4 AND format = $5
                    "#,
                )
                .bind(status)
                .bind(&key.original_id)
                .bind(dimension(key.size.width)?)
                .bind(dimension(key.size.height)?)
                .bind(key.format.canonical_name())
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "original_item", db.operation = "select", db.record_id = %id))]
    async fn find_original_by_id(&self, id: &str) -> StoreResult<Option<OriginalItem>> {
        let row = sqlx::query_as::<Postgres, OriginalItemRow>(
            "SELECT id, status, width, height, format, updated_at FROM original_item WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OriginalItemRow::to_original_item).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "derived_item", db.operation = "select", db.record_id = %key))]
    async fn find_derived_by_key(&self, key: &DerivedKey) -> StoreResult<Option<DerivedItem>> {
        let row = sqlx::query_as::<Postgres, DerivedItemRow>(
            r#"
            SELECT original_item_id, status, width, height, format, updated_at
            FROM derived_item
            WHERE original_item_id = $1 AND width = $2 AND height = $3 AND format = $4
            "#,
        )
        .bind(&key.original_id)
        .bind(dimension(key.size.width)?)
        .bind(dimension(key.size.height)?)
        .bind(key.format.canonical_name())
        .fetch_optional(&self.pool)
        .await?;

        row.map(DerivedItemRow::to_derived_item).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.operation = "select"))]
    async fn list_inconsistent(
        &self,
        kind: Option<ItemKind>,
        limit: usize,
    ) -> StoreResult<Vec<Item>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        match kind {
            Some(ItemKind::Original) => self.list_inconsistent_originals(limit).await,
            Some(ItemKind::Derived) => self.list_inconsistent_derived(limit).await,
            None => {
                let mut items = self.list_inconsistent_originals(limit).await?;
                items.extend(self.list_inconsistent_derived(limit).await?);
                items.sort_by_key(Item::updated_at);
                items.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
                Ok(items)
            }
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "original_item", db.operation = "delete", db.record_id = %id))]
    async fn delete_original(&self, id: &str) -> StoreResult<bool> {
        // derived_item rows go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM original_item WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "derived_item", db.operation = "select", db.record_id = %id))]
    async fn list_derived_for_original(&self, id: &str) -> StoreResult<Vec<DerivedItem>> {
        let rows = sqlx::query_as::<Postgres, DerivedItemRow>(
            r#"
            SELECT original_item_id, status, width, height, format, updated_at
            FROM derived_item
            WHERE original_item_id = $1
            ORDER BY width, height, format
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DerivedItemRow::to_derived_item).collect()
    }
}
