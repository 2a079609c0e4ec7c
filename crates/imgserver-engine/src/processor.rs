//! Request processor
//!
//! Saving an original: validate, decode, create the record as `Inconsistent`, copy the
//! file in, mark `Ok`. A duplicate id never overwrites the existing upload.
//!
//! Preparing a transformation: wait for the original to be consistent, return the cached
//! file if it already exists, otherwise race to create the derived record. The winner
//! produces the file and marks the record `Ok`; losers poll until it does (or until the
//! policy runs out) and return the same path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use imgserver_core::{
    validate_image_id, AppError, Config, DerivedItem, Item, ItemKey, ItemKind, ItemStatus,
    OriginalItem, TransformationRequest,
};
use imgserver_db::{ItemRepository, StoreError};
use imgserver_processing::{copy_atomic, CodecError, ImageCodec};

use crate::consistency::{wait_for_status_ok, ConsistencyPolicy};
use crate::paths::CachePathResolver;

/// Settings handed to the processor at construction.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub data_directory: PathBuf,
    pub consistency: ConsistencyPolicy,
}

impl ProcessorConfig {
    pub fn new(data_directory: impl Into<PathBuf>) -> Self {
        Self {
            data_directory: data_directory.into(),
            consistency: ConsistencyPolicy::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            data_directory: config.data_directory().to_path_buf(),
            consistency: ConsistencyPolicy::new(
                config.consistency_max_retries(),
                std::time::Duration::from_millis(config.consistency_retry_interval_ms()),
            ),
        }
    }

    pub fn with_consistency(mut self, consistency: ConsistencyPolicy) -> Self {
        self.consistency = consistency;
        self
    }
}

/// Turns a transformation request into the relative path of a cached derived file.
#[async_trait]
pub trait TransformationService: Send + Sync {
    async fn prepare_transformation(
        &self,
        request: &TransformationRequest,
    ) -> Result<String, AppError>;
}

#[async_trait]
impl<T: TransformationService + ?Sized> TransformationService for Arc<T> {
    async fn prepare_transformation(
        &self,
        request: &TransformationRequest,
    ) -> Result<String, AppError> {
        (**self).prepare_transformation(request).await
    }
}

/// Run blocking codec or filesystem work off the async runtime.
async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
}

/// Codec failures while deriving from an already accepted original.
fn transform_error(err: CodecError) -> AppError {
    match err {
        CodecError::Io { .. } => AppError::Io(err.to_string()),
        other => AppError::ImageProcessing(other.to_string()),
    }
}

/// Codec failures while accepting an upload. A source that cannot be read is as unusable
/// as one that does not decode.
fn upload_error(err: CodecError) -> AppError {
    match err {
        CodecError::Io { .. } => AppError::UnrecognizedImageFile(err.to_string()),
        other => other.into(),
    }
}

fn remove_if_exists(path: &Path) -> Result<bool, AppError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AppError::Io(format!("Failed to remove {}: {}", path.display(), e))),
    }
}

pub struct ImageRequestProcessor {
    repository: Arc<dyn ItemRepository>,
    codec: Arc<dyn ImageCodec>,
    paths: CachePathResolver,
    consistency: ConsistencyPolicy,
}

impl ImageRequestProcessor {
    /// Create the processor, creating the original and cache directories if needed.
    pub fn new(
        config: ProcessorConfig,
        repository: Arc<dyn ItemRepository>,
        codec: Arc<dyn ImageCodec>,
    ) -> Result<Self, AppError> {
        let paths = CachePathResolver::new(config.data_directory);
        paths.ensure_directories().map_err(|e| {
            AppError::Io(format!(
                "Failed to create data directories under {}: {}",
                paths.data_directory().display(),
                e
            ))
        })?;

        Ok(Self {
            repository,
            codec,
            paths,
            consistency: config.consistency,
        })
    }

    pub fn paths(&self) -> &CachePathResolver {
        &self.paths
    }

    pub fn repository(&self) -> &Arc<dyn ItemRepository> {
        &self.repository
    }

    /// Store the image at `source` as original `id`.
    #[tracing::instrument(skip(self, source), fields(image_id = %id, source_path = %source.display()))]
    pub async fn save_original(&self, source: &Path, id: &str) -> Result<OriginalItem, AppError> {
        validate_image_id(id)?;

        let codec = self.codec.clone();
        let source_path = source.to_path_buf();
        let handle = run_blocking(move || {
            let handle = codec.open(&source_path).map_err(upload_error)?;
            codec.verify(&handle).map_err(upload_error)?;
            Ok(handle)
        })
        .await?;

        let mut item = OriginalItem::new(id, ItemStatus::Inconsistent, handle.size(), handle.format());
        self.repository.create_original(&item).await.map_err(|e| match e {
            StoreError::DuplicateKey(_) => AppError::DuplicateIdentifier(id.to_string()),
            other => other.into(),
        })?;

        let destination = self.paths.original_path(id, item.format);
        let source_path = source.to_path_buf();
        let copied = run_blocking(move || {
            copy_atomic(&source_path, &destination).map_err(|e| AppError::Io(e.to_string()))
        })
        .await?;

        self.repository
            .update_status(&item.key(), ItemStatus::Ok)
            .await?;
        item.status = ItemStatus::Ok;

        tracing::info!(
            size = %item.size,
            format = %item.format,
            bytes = copied,
            "Original saved"
        );
        Ok(item)
    }

    pub async fn find_original(&self, id: &str) -> Result<Option<OriginalItem>, AppError> {
        validate_image_id(id)?;
        Ok(self.repository.find_original_by_id(id).await?)
    }

    pub async fn list_inconsistent(
        &self,
        kind: Option<ItemKind>,
        limit: usize,
    ) -> Result<Vec<Item>, AppError> {
        Ok(self.repository.list_inconsistent(kind, limit).await?)
    }

    /// Remove an original with its derived files and records. Files are removed before
    /// the records, so an interrupted delete can be rerun.
    #[tracing::instrument(skip(self), fields(image_id = %id))]
    pub async fn delete_original(&self, id: &str) -> Result<bool, AppError> {
        validate_image_id(id)?;

        let Some(original) = self.repository.find_original_by_id(id).await? else {
            return Ok(false);
        };

        let derived = self.repository.list_derived_for_original(id).await?;
        let mut paths: Vec<PathBuf> = derived
            .iter()
            .map(|item| self.paths.derived_path(&item.key).absolute)
            .collect();
        paths.push(self.paths.original_path(id, original.format));

        let removed = run_blocking(move || {
            let mut removed = 0usize;
            for path in &paths {
                if remove_if_exists(path)? {
                    removed += 1;
                }
            }
            Ok(removed)
        })
        .await?;

        let deleted = self.repository.delete_original(id).await?;
        tracing::info!(files_removed = removed, derived = derived.len(), "Original deleted");
        Ok(deleted)
    }

    /// Produce the derived file for `request` as the sole producer of its key.
    async fn produce(
        &self,
        request: &TransformationRequest,
        original: &OriginalItem,
        destination: PathBuf,
    ) -> Result<(), AppError> {
        let started = Instant::now();
        let codec = self.codec.clone();
        let source = self.paths.original_path(&original.id, original.format);
        let target_size = request.size();
        let target_format = request.format();

        let copied = run_blocking(move || {
            let handle = codec.open(&source).map_err(transform_error)?;
            if handle.size() == target_size && handle.format() == target_format {
                copy_atomic(&source, &destination).map_err(transform_error)?;
                return Ok(true);
            }
            let resized = codec
                .resize_crop_to_fit(&handle, target_size)
                .map_err(transform_error)?;
            codec
                .save(&resized, &destination, target_format)
                .map_err(transform_error)?;
            Ok(false)
        })
        .await?;

        self.repository
            .update_status(&ItemKey::Derived(request.derived_key()), ItemStatus::Ok)
            .await?;

        tracing::info!(
            copied,
            duration_ms = started.elapsed().as_millis() as u64,
            "Transformation completed"
        );
        Ok(())
    }
}

#[async_trait]
impl TransformationService for ImageRequestProcessor {
    #[tracing::instrument(skip(self), fields(image_id = %request.image_id(), size = %request.size(), format = %request.format()))]
    async fn prepare_transformation(
        &self,
        request: &TransformationRequest,
    ) -> Result<String, AppError> {
        let id = request.image_id();
        let original = self
            .repository
            .find_original_by_id(id)
            .await?
            .ok_or_else(|| AppError::OriginalNotFound(id.to_string()))?;

        wait_for_status_ok(
            self.repository.as_ref(),
            &ItemKey::Original(id.to_string()),
            &self.consistency,
        )
        .await?;

        let key = request.derived_key();
        let cache_path = self.paths.derived_path(&key);

        let exists = {
            let absolute = cache_path.absolute.clone();
            run_blocking(move || Ok(absolute.is_file())).await?
        };
        if exists {
            tracing::debug!(path = %cache_path.relative, "Cache hit");
            return Ok(cache_path.relative);
        }

        match self
            .repository
            .create_derived(&DerivedItem::new(key.clone(), ItemStatus::Inconsistent))
            .await
        {
            Ok(()) => {
                tracing::debug!(path = %cache_path.relative, "Derived item created, producing");
                self.produce(request, &original, cache_path.absolute.clone())
                    .await?;
            }
            Err(StoreError::DuplicateKey(_)) => {
                tracing::debug!(path = %cache_path.relative, "Derived item exists, waiting for producer");
                wait_for_status_ok(
                    self.repository.as_ref(),
                    &ItemKey::Derived(key),
                    &self.consistency,
                )
                .await?;
            }
            Err(StoreError::NotFound(_)) => {
                return Err(AppError::OriginalNotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(cache_path.relative)
    }
}
