//! Service assembly
//!
//! Builds the item store, codec and processor from [`Config`] and wraps the processor's
//! transformation entry point with the size allow-list.

use std::sync::Arc;

use anyhow::Context;
use imgserver_core::{AllowedSizes, AppError, Config};
use imgserver_db::{setup_database, ItemRepository, MemoryItemRepository, PgItemRepository};
use imgserver_processing::{ImageCodec, ImageRsCodec};

use crate::authorization::SizeAuthorization;
use crate::processor::{ImageRequestProcessor, ProcessorConfig, TransformationService};

/// The assembled service: the processor for uploads and administration, and the
/// authorized transformation entry point for serving derived images.
#[derive(Clone)]
pub struct ImageService {
    pub processor: Arc<ImageRequestProcessor>,
    pub transformations: Arc<dyn TransformationService>,
}

/// Wire an already built store and codec into a service.
pub fn assemble(
    config: ProcessorConfig,
    allowed_sizes: AllowedSizes,
    repository: Arc<dyn ItemRepository>,
    codec: Arc<dyn ImageCodec>,
) -> Result<ImageService, AppError> {
    let processor = Arc::new(ImageRequestProcessor::new(config, repository, codec)?);
    let transformations: Arc<dyn TransformationService> =
        Arc::new(SizeAuthorization::new(processor.clone(), allowed_sizes));

    Ok(ImageService {
        processor,
        transformations,
    })
}

/// Build the service described by `config`.
///
/// PostgreSQL is used whenever `DATABASE_URL` is set; dev mode without one falls back to
/// the in-memory store, which loses all records on exit.
pub async fn build_image_service(config: &Config) -> anyhow::Result<ImageService> {
    let repository: Arc<dyn ItemRepository> = match config.database_url() {
        Some(_) => {
            let pool = setup_database(config).await?;
            Arc::new(PgItemRepository::new(pool))
        }
        None if config.dev_mode() => {
            tracing::warn!("DEV_MODE without DATABASE_URL: using in-memory item store");
            Arc::new(MemoryItemRepository::new())
        }
        None => anyhow::bail!("DATABASE_URL must be set unless DEV_MODE is enabled"),
    };

    let processor_config = ProcessorConfig::from_config(config);
    tracing::info!(
        data_directory = %processor_config.data_directory.display(),
        max_retries = processor_config.consistency.max_retries,
        retry_interval_ms = processor_config.consistency.interval.as_millis() as u64,
        allowed_sizes = %config.allowed_sizes(),
        "Assembling image service"
    );

    assemble(
        processor_config,
        config.allowed_sizes().clone(),
        repository,
        Arc::new(ImageRsCodec::new()),
    )
    .context("Failed to initialize request processor")
}
