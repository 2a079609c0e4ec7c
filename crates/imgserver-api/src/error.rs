//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>` and use `?` on anything that
//! converts into [`AppError`]; status, body and logging are then derived from
//! [`ErrorMetadata`].

use std::sync::OnceLock;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use imgserver_core::{AppError, ErrorMetadata, LogLevel};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether retrying the same request may succeed
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    fn from_app_error(error: &AppError, with_details: bool) -> Self {
        Self {
            error: error.client_message(),
            details: with_details.then(|| error.detailed_message()),
            error_type: with_details.then(|| error.error_type().to_string()),
            code: error.error_code().to_string(),
            recoverable: error.is_recoverable(),
            suggested_action: error.suggested_action().map(String::from),
        }
    }
}

/// Wrapper type so the external `IntoResponse` trait can be implemented for `AppError`.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Request failed");
        }
    }
}

static PRODUCTION_MODE: OnceLock<bool> = OnceLock::new();

/// Fix whether error bodies are rendered for production, from [`Config::is_production`].
///
/// Only the first call takes effect; until then responses are rendered as non-production.
///
/// [`Config::is_production`]: imgserver_core::Config::is_production
pub fn set_production_mode(is_production: bool) {
    if PRODUCTION_MODE.set(is_production).is_err() && is_production_mode() != is_production {
        tracing::warn!(
            is_production,
            "Error response mode already set, ignoring the new value"
        );
    }
}

fn is_production_mode() -> bool {
    PRODUCTION_MODE.get().copied().unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details never leave the process in production or for sensitive errors.
        let with_details = !is_production_mode() && !app_error.is_sensitive();
        let body = ErrorResponse::from_app_error(app_error, with_details);

        (status, Json(body)).into_response()
    }
}
