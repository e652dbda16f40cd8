//! Health check handlers for service monitoring.
//!
//! `/health` probes the storage backend and answers 503 when it is down.
//! `/live` only proves the process is serving HTTP.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use finhook_core::{Clock, RecordStore};
use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::state::AppState;

/// Service name reported by the liveness probe.
pub const SERVICE_NAME: &str = "finhook-api";

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: HealthStatus,
    /// Timestamp when health check was performed
    pub timestamp: DateTime<Utc>,
    /// Individual component health checks
    pub checks: HealthChecks,
    /// Service version information
    pub version: String,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Storage is reachable
    Healthy,
    /// Storage is failing
    Unhealthy,
}

/// Individual component health check results.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Storage backend probe
    pub storage: ComponentHealth,
}

/// Health status for individual components.
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    /// Component status
    pub status: ComponentStatus,
    /// Error message if the component is down
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response time in milliseconds
    pub response_time_ms: u64,
}

/// Component-level health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is healthy
    Up,
    /// Component is failing
    Down,
}

/// Runs health probes against the configured store.
pub struct HealthService {
    clock: Arc<dyn Clock>,
}

impl HealthService {
    /// Creates a new health service with the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Probes the store and builds the report.
    pub async fn health_check(&self, store: &dyn RecordStore) -> HealthResponse {
        let timestamp = DateTime::<Utc>::from(self.clock.now_system());
        let started = self.clock.now();

        let (status, message) = match store.health_check().await {
            Ok(()) => (ComponentStatus::Up, None),
            Err(e) => {
                error!(error = %e, "Storage health check failed");
                (ComponentStatus::Down, Some(format!("Storage unavailable: {e}")))
            },
        };
        let elapsed = self.clock.now().saturating_duration_since(started);

        HealthResponse {
            status: match status {
                ComponentStatus::Up => HealthStatus::Healthy,
                ComponentStatus::Down => HealthStatus::Unhealthy,
            },
            timestamp,
            checks: HealthChecks {
                storage: ComponentHealth {
                    status,
                    message,
                    response_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                },
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Health check endpoint handler.
#[instrument(name = "health_check", skip_all)]
pub async fn health_check(State(state): State<AppState>) -> Response {
    let response = HealthService::new(Arc::clone(&state.clock)).health_check(state.store().as_ref()).await;

    let status_code = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    debug!(status = ?response.status, storage = ?response.checks.storage.status, "Health check completed");

    (status_code, Json(response)).into_response()
}

#[derive(Serialize)]
struct Liveness {
    status: &'static str,
    timestamp: DateTime<Utc>,
    service: &'static str,
}

/// Liveness check endpoint.
///
/// Does not touch storage.
#[instrument(name = "liveness_check", skip_all)]
pub async fn liveness_check(State(state): State<AppState>) -> Response {
    let body = Liveness {
        status: "alive",
        timestamp: DateTime::<Utc>::from(state.clock.now_system()),
        service: SERVICE_NAME,
    };

    (StatusCode::OK, Json(body)).into_response()
}
