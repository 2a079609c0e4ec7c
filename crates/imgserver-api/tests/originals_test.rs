//! Upload and metadata routes.
//!
//! Run with: `cargo test -p imgserver-api --test originals_test`

mod helpers;

use axum::http::StatusCode;
use helpers::{body_json, jpeg_bytes, setup_test_app, setup_test_app_with};

#[tokio::test]
async fn test_health() {
    let app = setup_test_app().await;
    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "alive");
}

#[tokio::test]
async fn test_upload_original() {
    let app = setup_test_app().await;
    let response = app.put_original("sami1", jpeg_bytes(200, 100)).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["id"], "sami1");
    assert_eq!(json["status"], "OK");
    assert_eq!(json["format"], "JPEG");
    assert_eq!(json["size"]["width"], 200);
    assert_eq!(json["size"]["height"], 100);

    let stored = app
        .state
        .service
        .processor
        .paths()
        .original_directory()
        .join("sami1.jpg");
    assert!(stored.is_file());
}

#[tokio::test]
async fn test_upload_duplicate_is_conflict() {
    let app = setup_test_app().await;
    let first = app.put_original("sami1", jpeg_bytes(40, 40)).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app.put_original("sami1", jpeg_bytes(80, 80)).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["code"], "DUPLICATE_IDENTIFIER");

    let metadata = body_json(app.get("/api/v0/originals/sami1").await).await;
    assert_eq!(metadata["size"]["width"], 40);
}

#[tokio::test]
async fn test_upload_non_image_is_rejected() {
    let app = setup_test_app().await;
    let response = app
        .put_original("notes", b"definitely not an image".to_vec())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "UNRECOGNIZED_IMAGE_FILE");

    let missing = app.get("/api/v0/originals/notes").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_invalid_identifier() {
    let app = setup_test_app().await;
    let response = app.put_original("sami-1", jpeg_bytes(10, 10)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_IDENTIFIER");
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let app = setup_test_app_with(&[("MAX_UPLOAD_SIZE_MB", "1")]).await;
    let response = app.put_original("big", vec![0u8; 2 * 1024 * 1024]).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_get_original_not_found() {
    let app = setup_test_app().await;
    let response = app.get("/api/v0/originals/nothere").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "ORIGINAL_NOT_FOUND");
    assert_eq!(json["recoverable"], false);
}

#[tokio::test]
async fn test_openapi_document() {
    let app = setup_test_app().await;
    let response = app.get("/api/v0/openapi.json").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["paths"]["/api/v0/originals/{id}"].is_object());
    assert!(json["paths"]["/api/v0/originals/{id}/derived/{size}/{format}"].is_object());
}
