//! HTTP error responses.
//!
//! Every error is reported as `{"message": ...}` with the messages the
//! provider integration expects. Internal details are logged, never returned.

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use finhook_core::CoreError;
use serde::Serialize;
use tracing::error;

/// Message for a missing or wrong API key.
pub const UNAUTHORIZED_MESSAGE: &str = "API Key inválida ou não fornecida";
/// Message for an envelope that fails validation.
pub const INVALID_PAYLOAD_MESSAGE: &str = "Dados inválidos ou incompletos";
/// Message for any failure while storing a webhook.
pub const SUBMIT_FAILED_MESSAGE: &str = "Erro ao processar webhook";
/// Message for any failure while listing webhooks.
pub const LIST_FAILED_MESSAGE: &str = "Erro ao listar webhooks";
/// Message for a panic caught outside the handlers.
pub const INTERNAL_ERROR_MESSAGE: &str = "Erro interno do servidor";

/// Errors surfaced by the webhook endpoints.
#[derive(Debug)]
pub enum ApiError {
    /// The `x-api-key` header is missing or does not match.
    Unauthorized,
    /// The envelope is missing required fields.
    InvalidPayload,
    /// Storing the webhook failed.
    SubmitFailed,
    /// Reading stored webhooks failed.
    ListFailed,
}

impl ApiError {
    /// Maps a core error raised while storing a webhook.
    pub fn from_submit(err: &CoreError) -> Self {
        if err.is_client_error() {
            Self::InvalidPayload
        } else {
            error!(error = %err, "Failed to process webhook");
            Self::SubmitFailed
        }
    }

    /// Maps a core error raised while listing webhooks.
    pub fn from_list(err: &CoreError) -> Self {
        error!(error = %err, "Failed to list webhooks");
        Self::ListFailed
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidPayload => StatusCode::BAD_REQUEST,
            Self::SubmitFailed | Self::ListFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn message(&self) -> &'static str {
        match self {
            Self::Unauthorized => UNAUTHORIZED_MESSAGE,
            Self::InvalidPayload => INVALID_PAYLOAD_MESSAGE,
            Self::SubmitFailed => SUBMIT_FAILED_MESSAGE,
            Self::ListFailed => LIST_FAILED_MESSAGE,
        }
    }
}

#[derive(Serialize)]
struct MessageBody {
    message: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(MessageBody { message: self.message() })).into_response()
    }
}

#[derive(Serialize)]
struct PanicBody {
    status: &'static str,
    message: &'static str,
}

/// Response for a panic caught by the outermost middleware.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Unhandled error in request");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(PanicBody { status: "error", message: INTERNAL_ERROR_MESSAGE }),
    )
        .into_response()
}
