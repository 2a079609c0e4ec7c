//! imgserver HTTP API
//!
//! Axum handlers for uploading originals and serving derived images, plus the
//! application setup used by the `imgserver-api` binary.

pub mod api_doc;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use setup::routes::{setup_routes, API_PREFIX};
pub use setup::{build_state, initialize_app};
pub use state::AppState;
