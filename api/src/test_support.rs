//! In-process router helpers shared by route tests.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    http::{Request, StatusCode, header},
};
use backend_service::BackendConfig;
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    build_router,
    core::app_state::{AppConfig, AppState},
};

pub fn router_with(backends: BackendConfig) -> Router {
    let config = AppConfig {
        api_address: "127.0.0.1:0".into(),
        backends,
    };
    build_router(Arc::new(AppState::new(config).unwrap()))
}

pub async fn send_bytes(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes)
}

pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send_bytes(app, req).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn post_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn post_raw(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    send(app, post_request(uri, body)).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, &body.to_string()).await
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, req).await
}
