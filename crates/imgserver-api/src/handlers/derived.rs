//! Serves derived images, producing them on first request.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use imgserver_core::{AppError, ImageFormat, Size, TransformationRequest};

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Relative cache path of the served file, for CDN and debugging use.
pub const CACHE_PATH_HEADER: &str = "x-cache-path";

const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[utoipa::path(
    get,
    path = "/api/v0/originals/{id}/derived/{size}/{format}",
    tag = "derived",
    params(
        ("id" = String, Path, description = "Identifier of the original image"),
        ("size" = String, Path, description = "Target size as WxH, e.g. 100x100"),
        ("format" = String, Path, description = "Target format name, e.g. JPEG or png")
    ),
    responses(
        (status = 200, description = "Derived image bytes", content_type = "image/*"),
        (status = 400, description = "Invalid identifier, size or format", body = ErrorResponse),
        (status = 403, description = "Size not in the allow-list", body = ErrorResponse),
        (status = 404, description = "Original not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(image_id = %id, size = %size, format = %format, operation = "get_derived"))]
pub async fn get_derived(
    Path((id, size, format)): Path<(String, String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, HttpAppError> {
    let size: Size = size.parse()?;
    let format: ImageFormat = format.parse()?;
    let request = TransformationRequest::new(id, size, format)?;

    let relative = state
        .service
        .transformations
        .prepare_transformation(&request)
        .await?;

    let absolute = state.service.processor.paths().resolve(&relative);
    let data = tokio::fs::read(&absolute).await.map_err(|e| {
        tracing::error!(error = %e, path = %absolute.display(), "Failed to read derived image");
        AppError::Io(format!("{}: {}", absolute.display(), e))
    })?;

    let cache_path = HeaderValue::from_str(&relative)
        .map_err(|e| AppError::Internal(format!("Invalid cache path header: {}", e)))?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.mime_type())
        .header(header::CONTENT_LENGTH, data.len())
        .header(header::CACHE_CONTROL, IMMUTABLE_CACHE_CONTROL)
        .header(CACHE_PATH_HEADER, cache_path)
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

