//! Upload and metadata routes for original images.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use imgserver_core::{AppError, OriginalItem};
use tempfile::NamedTempFile;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Spool the request body into a scratch file next to the data it will be copied into.
async fn spool_upload(directory: PathBuf, body: Bytes) -> Result<NamedTempFile, AppError> {
    tokio::task::spawn_blocking(move || -> Result<NamedTempFile, AppError> {
        let mut file = tempfile::Builder::new()
            .prefix(".upload-")
            .tempfile_in(&directory)?;
        file.write_all(&body)?;
        file.as_file().sync_all()?;
        Ok(file)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Upload spooling task failed: {}", e)))?
}

#[utoipa::path(
    put,
    path = "/api/v0/originals/{id}",
    tag = "originals",
    params(
        ("id" = String, Path, description = "Image identifier, ASCII letters and digits only")
    ),
    request_body(
        content = Vec<u8>,
        content_type = "application/octet-stream",
        description = "Raw image file"
    ),
    responses(
        (status = 201, description = "Original stored", body = OriginalItem),
        (status = 400, description = "Invalid identifier or unrecognized image file", body = ErrorResponse),
        (status = 409, description = "An original with this identifier already exists", body = ErrorResponse),
        (status = 413, description = "Upload exceeds the configured size limit"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, body), fields(image_id = %id, bytes = body.len(), operation = "upload_original"))]
pub async fn upload_original(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    imgserver_core::validate_image_id(&id)?;

    let scratch = spool_upload(state.config.data_directory().to_path_buf(), body).await?;
    let item = state.service.processor.save_original(scratch.path(), &id).await?;

    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    get,
    path = "/api/v0/originals/{id}",
    tag = "originals",
    params(
        ("id" = String, Path, description = "Image identifier")
    ),
    responses(
        (status = 200, description = "Original found", body = OriginalItem),
        (status = 400, description = "Invalid identifier", body = ErrorResponse),
        (status = 404, description = "Original not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(image_id = %id, operation = "get_original"))]
pub async fn get_original(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let item = state
        .service
        .processor
        .find_original(&id)
        .await?
        .ok_or_else(|| AppError::OriginalNotFound(id.clone()))?;

    Ok(Json(item))
}
