//! Shared fixtures for the HTTP integration tests.
//!
//! Each test app runs in dev mode over the in-memory item store with its own scratch
//! data directory, and is driven through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use image::{ImageFormat, Rgb, RgbImage};
use imgserver_api::{build_state, setup_routes, AppState};
use imgserver_core::Config;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn put_original(&self, id: &str, data: Vec<u8>) -> Response<Body> {
        let request = Request::builder()
            .method("PUT")
            .uri(format!("/api/v0/originals/{}", id))
            .header("content-type", "application/octet-stream")
            .header("content-length", data.len())
            .body(Body::from(data))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[]).await
}

pub async fn setup_test_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut vars: HashMap<String, String> = HashMap::from([
        ("DEV_MODE".to_string(), "true".to_string()),
        (
            "DATA_DIRECTORY".to_string(),
            dir.path().join("data").display().to_string(),
        ),
        ("ALLOWED_SIZES".to_string(), "100x100,800x600".to_string()),
        ("CONSISTENCY_MAX_RETRIES".to_string(), "200".to_string()),
        ("CONSISTENCY_RETRY_INTERVAL_MS".to_string(), "10".to_string()),
    ]);
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }

    let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
    config.validate().unwrap();

    let state = build_state(config.clone()).await.unwrap();
    let router = setup_routes(&config, state.clone());

    TestApp {
        router,
        state,
        _dir: dir,
    }
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
