//! Webhook submission and listing handlers.
//!
//! Both routes sit behind the API key middleware, so handlers here only deal
//! with payload validation and storage outcomes.

use axum::{
    extract::State,
    http::{header::CONTENT_LENGTH, HeaderMap},
    Json,
};
use bytes::Bytes;
use finhook_core::{Listing, Metadata, WebhookType};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::{error::ApiError, state::AppState};

/// Message returned for an accepted webhook.
pub const ACCEPTED_MESSAGE: &str = "Webhook processada com sucesso";

/// Acknowledgement for an accepted webhook.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AckResponse {
    /// Fixed success message
    pub message: &'static str,
    /// Name the record was stored under
    pub file_name: String,
    /// Classification of the envelope
    pub webhook_type: WebhookType,
    /// Summary derived from the envelope
    pub metadata: Metadata,
}

/// Accepts a provider webhook and stores it.
///
/// The body is read as raw bytes so the envelope is kept exactly as sent.
///
/// # Errors
///
/// - 400 when the body is not a JSON object with a non-empty `response.url`
/// - 500 when the record cannot be persisted
#[instrument(
    name = "submit_webhook",
    skip_all,
    fields(
        content_length = headers.get(CONTENT_LENGTH).and_then(|v| v.to_str().ok()).unwrap_or("unknown"),
    )
)]
pub async fn submit_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AckResponse>, ApiError> {
    info!("Processing webhook submission");

    let raw: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Body is not valid JSON");
        ApiError::InvalidPayload
    })?;

    let receipt = state.ingestion.submit(raw).await.map_err(|e| {
        if e.is_client_error() {
            warn!(error = %e, "Rejected webhook payload");
        }
        ApiError::from_submit(&e)
    })?;

    Ok(Json(AckResponse {
        message: ACCEPTED_MESSAGE,
        file_name: receipt.file_name,
        webhook_type: receipt.webhook_type,
        metadata: receipt.metadata,
    }))
}

/// Returns every stored webhook grouped by type.
///
/// Types without records map to an empty array.
#[instrument(name = "list_webhooks", skip_all)]
pub async fn list_webhooks(State(state): State<AppState>) -> Result<Json<Listing>, ApiError> {
    let listing = state.ingestion.list().await.map_err(|e| ApiError::from_list(&e))?;

    debug!(total = listing.values().map(Vec::len).sum::<usize>(), "Listed webhooks");
    Ok(Json(listing))
}
