//! API key authentication middleware.
//!
//! The provider sends a static shared secret in `x-api-key`. Requests without
//! it, or with any other value, are rejected before the body is read.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{error::ApiError, state::AppState};

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Extracts the API key from the `x-api-key` header.
fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())
}

/// Axum middleware that rejects requests without the configured API key.
pub async fn auth_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    match extract_api_key(req.headers()) {
        Some(key) if state.api_key_matches(key) => Ok(next.run(req).await),
        Some(_) => {
            warn!(path = %req.uri().path(), "Rejected request with invalid API key");
            Err(ApiError::Unauthorized)
        },
        None => {
            warn!(path = %req.uri().path(), "Rejected request without API key");
            Err(ApiError::Unauthorized)
        },
    }
}
