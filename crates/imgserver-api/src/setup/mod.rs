//! Application setup and initialization

pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use imgserver_core::Config;
use imgserver_engine::build_image_service;

use crate::state::AppState;

/// Validate configuration, start tracing, assemble the image service and its routes.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())?;
    tracing::info!(environment = %config.environment(), "Configuration loaded and validated");

    let state = build_state(config).await?;
    let router = routes::setup_routes(&state.config, state.clone());

    Ok((state, router))
}

/// Assemble the shared state without touching global tracing state.
pub async fn build_state(config: Config) -> Result<Arc<AppState>> {
    let service = build_image_service(&config)
        .await
        .context("Failed to build image service")?;
    Ok(Arc::new(AppState::new(service, config)))
}
