//! OpenAPI documentation, served at `/api/v0/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use imgserver_core::{ImageFormat, ItemStatus, OriginalItem, Size};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "imgserver API",
        version = "0.1.0",
        description = "Image conversion and rescale service (v0). Originals are uploaded once per identifier; derived sizes and formats are produced on first request and served from the cache afterwards."
    ),
    paths(
        handlers::originals::upload_original,
        handlers::originals::get_original,
        handlers::derived::get_derived,
    ),
    components(schemas(
        OriginalItem,
        ItemStatus,
        ImageFormat,
        Size,
        error::ErrorResponse,
    )),
    tags(
        (name = "originals", description = "Upload and inspect original images"),
        (name = "derived", description = "Resized and converted images")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v0/originals/{id}"));
        assert!(doc
            .paths
            .paths
            .contains_key("/api/v0/originals/{id}/derived/{size}/{format}"));
    }
}
