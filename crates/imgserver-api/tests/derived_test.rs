//! Derived image route: authorization, production and cache headers.
//!
//! Run with: `cargo test -p imgserver-api --test derived_test`

mod helpers;

use axum::http::{header, StatusCode};
use helpers::{body_bytes, body_json, jpeg_bytes, setup_test_app};
use imgserver_db::ItemRepository;

#[tokio::test]
async fn test_derived_image_is_produced_and_served() {
    let app = setup_test_app().await;
    app.put_original("sami1", jpeg_bytes(200, 100)).await;

    let response = app
        .get("/api/v0/originals/sami1/derived/100x100/jpeg")
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "public, max-age=31536000, immutable"
    );
    assert_eq!(headers["x-cache-path"], "cache/sami1-100x100.jpg");

    let data = body_bytes(response).await;
    let img = image::load_from_memory(&data).unwrap();
    assert_eq!((img.width(), img.height()), (100, 100));
}

#[tokio::test]
async fn test_format_conversion() {
    let app = setup_test_app().await;
    app.put_original("sami1", jpeg_bytes(1000, 700)).await;

    let response = app
        .get("/api/v0/originals/sami1/derived/800x600/PNG")
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-cache-path"], "cache/sami1-800x600.png");
    let data = body_bytes(response).await;
    assert_eq!(
        image::guess_format(&data).unwrap(),
        image::ImageFormat::Png
    );
}

#[tokio::test]
async fn test_repeated_requests_serve_the_cached_file() {
    let app = setup_test_app().await;
    app.put_original("sami1", jpeg_bytes(300, 300)).await;

    let first = body_bytes(app.get("/api/v0/originals/sami1/derived/100x100/JPEG").await).await;
    let cached = app
        .state
        .service
        .processor
        .paths()
        .resolve("cache/sami1-100x100.jpg");
    let modified = std::fs::metadata(&cached).unwrap().modified().unwrap();

    let second = body_bytes(app.get("/api/v0/originals/sami1/derived/100x100/JPEG").await).await;
    assert_eq!(first, second);
    assert_eq!(std::fs::metadata(&cached).unwrap().modified().unwrap(), modified);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_agree() {
    let app = setup_test_app().await;
    app.put_original("sami1", jpeg_bytes(400, 300)).await;

    let requests = (0..8).map(|_| app.get("/api/v0/originals/sami1/derived/100x100/JPEG"));
    let responses = futures::future::join_all(requests).await;

    let mut bodies = Vec::new();
    for response in responses {
        assert_eq!(response.status(), StatusCode::OK);
        bodies.push(body_bytes(response).await);
    }
    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));

    let derived = app
        .state
        .service
        .processor
        .repository()
        .list_derived_for_original("sami1")
        .await
        .unwrap();
    assert_eq!(derived.len(), 1);
}

#[tokio::test]
async fn test_size_outside_allow_list_is_forbidden() {
    let app = setup_test_app().await;
    app.put_original("sami1", jpeg_bytes(200, 100)).await;

    let response = app
        .get("/api/v0/originals/sami1/derived/600x800/JPEG")
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "SIZE_NOT_AUTHORIZED");
    let cached = app
        .state
        .service
        .processor
        .paths()
        .resolve("cache/sami1-600x800.jpg");
    assert!(!cached.exists());
}

#[tokio::test]
async fn test_unknown_original_is_not_found() {
    let app = setup_test_app().await;
    let response = app
        .get("/api/v0/originals/ghost/derived/100x100/JPEG")
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "ORIGINAL_NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_size_and_format() {
    let app = setup_test_app().await;
    app.put_original("sami1", jpeg_bytes(200, 100)).await;

    let bad_size = app.get("/api/v0/originals/sami1/derived/wide/JPEG").await;
    assert_eq!(bad_size.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(bad_size).await["code"], "INVALID_INPUT");

    let bad_format = app.get("/api/v0/originals/sami1/derived/100x100/XCF").await;
    assert_eq!(bad_format.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(bad_format).await["code"], "UNSUPPORTED_FORMAT");
}

#[tokio::test]
async fn test_invalid_identifier_on_derived_route() {
    let app = setup_test_app().await;
    let response = app
        .get("/api/v0/originals/sami_1/derived/100x100/JPEG")
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_IDENTIFIER");
}

#[tokio::test]
async fn test_oversized_icon_rejected_before_production() {
    let app = setup_test_app().await;
    app.put_original("sami1", jpeg_bytes(200, 100)).await;

    let response = app.get("/api/v0/originals/sami1/derived/800x600/ICO").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_INPUT");

    let key = imgserver_core::DerivedKey::new(
        "sami1",
        imgserver_core::Size::new(800, 600).unwrap(),
        imgserver_core::ImageFormat::Ico,
    );
    let repository = app.state.service.processor.repository();
    assert!(repository.find_derived_by_key(&key).await.unwrap().is_none());

    let response = app.get("/api/v0/originals/sami1/derived/100x100/ICO").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-cache-path"], "cache/sami1-100x100.ico");
}
