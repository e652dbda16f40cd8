//! Integration tests for the API key middleware.
//!
//! Covers accepted and rejected keys on a bare route and on the real webhook
//! routes, and checks that rejected submissions leave storage untouched.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    routing::get,
    Router,
};
use finhook_api::{error::UNAUTHORIZED_MESSAGE, middleware::auth::auth_middleware, AppState};
use finhook_core::{MemoryRecordStore, TestClock, WebhookType};
use finhook_testing::{EnvelopeBuilder, TestEnv};
use tower::ServiceExt;

fn guarded_app(api_key: &str) -> Router {
    let state =
        AppState::new(Arc::new(MemoryRecordStore::new()), Arc::new(TestClock::new()), api_key);

    Router::new()
        .route("/guarded", get(|| async { "ok" }))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

async fn call(app: Router, key: Option<&str>) -> StatusCode {
    let mut builder = Request::builder().uri("/guarded");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    let request = builder.body(Body::empty()).expect("request build");

    app.oneshot(request).await.expect("request execution").status()
}

#[tokio::test]
async fn valid_key_reaches_the_handler() {
    assert_eq!(call(guarded_app("secret"), Some("secret")).await, StatusCode::OK);
}

#[tokio::test]
async fn missing_key_is_rejected() {
    assert_eq!(call(guarded_app("secret"), None).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_key_is_rejected() {
    assert_eq!(call(guarded_app("secret"), Some("secreT")).await, StatusCode::UNAUTHORIZED);
    assert_eq!(call(guarded_app("secret"), Some("")).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn submission_with_wrong_key_writes_nothing() {
    let env = TestEnv::new().expect("test env setup");
    let body = serde_json::to_vec(&EnvelopeBuilder::operations("123").build()).expect("serialize");

    let response = env.post_raw(body, Some("not-the-key")).await.expect("request");

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.message(), Some(UNAUTHORIZED_MESSAGE));
    assert_eq!(env.file_count().expect("count files"), 0);
}

#[tokio::test]
async fn submission_without_key_writes_nothing() {
    let env = TestEnv::new().expect("test env setup");
    let body = serde_json::to_vec(&EnvelopeBuilder::positions().build()).expect("serialize");

    let response = env.post_raw(body, None).await.expect("request");

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(env.files_in(WebhookType::PositionsByPartner).expect("list files").is_empty());
}

#[tokio::test]
async fn unauthorized_is_checked_before_payload_validation() {
    let env = TestEnv::new().expect("test env setup");

    let response = env.post_raw("{}", None).await.expect("request");

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn listing_requires_the_key() {
    let env = TestEnv::new().expect("test env setup");

    let response = env.list_webhooks(Some("wrong")).await.expect("request");

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.message(), Some(UNAUTHORIZED_MESSAGE));
}
