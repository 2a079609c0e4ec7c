//! Route configuration and setup.

mod health;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Json, Router,
};
use imgserver_core::Config;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;

pub const API_PREFIX: &str = "/api/v0";

fn image_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/originals/{{id}}", API_PREFIX),
            get(handlers::originals::get_original).put(handlers::originals::upload_original),
        )
        .route(
            &format!("{}/originals/{{id}}/derived/{{size}}/{{format}}", API_PREFIX),
            get(handlers::derived::get_derived),
        )
}

/// Build the application router over `state`.
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router {
    crate::error::set_production_mode(config.is_production());

    let max_body = config.max_upload_size_bytes();
    tracing::info!(max_upload_bytes = max_body, "Request body limit enabled");

    Router::new()
        .merge(image_routes())
        .route("/health", get(health::liveness_check))
        .route(
            &format!("{}/openapi.json", API_PREFIX),
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
