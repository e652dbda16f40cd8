//! Test infrastructure for driving the finhook HTTP API in-process.
//!
//! `TestEnv` wires a router to a temporary storage directory and a frozen
//! clock, then exposes request helpers that return parsed JSON responses.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use finhook_api::{create_router, AppState, Config};
use finhook_core::{FileRecordStore, RecordStore, TestClock, WebhookType};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub mod fixtures;

pub use fixtures::EnvelopeBuilder;

/// Milliseconds since the epoch at which every test clock starts.
pub const TEST_EPOCH_MS: u64 = 1_700_000_000_000;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Parsed response from the in-process router.
#[derive(Debug)]
pub struct TestResponse {
    /// Response status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Body parsed as JSON; `Null` when empty, a string when not JSON
    pub body: Value,
}

impl TestResponse {
    /// The `message` field of a JSON body, if any.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }
}

/// Isolated API environment for integration tests.
pub struct TestEnv {
    /// Deterministic clock shared with the router
    pub clock: TestClock,
    /// Configuration the router was built with
    pub config: Config,
    store: Arc<dyn RecordStore>,
    storage_dir: Option<TempDir>,
    router: Router,
}

impl TestEnv {
    /// Creates an environment backed by a fresh temporary directory.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("failed to create storage directory")?;
        let store = Arc::new(FileRecordStore::new(dir.path()));
        let mut env = Self::with_store(store);
        env.config.storage_root = dir.path().to_path_buf();
        env.storage_dir = Some(dir);
        Ok(env)
    }

    /// Creates an environment over an arbitrary store.
    pub fn with_store(store: Arc<dyn RecordStore>) -> Self {
        let clock = TestClock::with_start_time(UNIX_EPOCH + Duration::from_millis(TEST_EPOCH_MS));
        let config = Config::default();
        let state = AppState::new(Arc::clone(&store), Arc::new(clock.clone()), &config.api_key);
        let router = create_router(state, &config);

        Self { clock, config, store, storage_dir: None, router }
    }

    /// Store the router writes to.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Router under test.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// API key the router expects.
    pub fn api_key(&self) -> &str {
        &self.config.api_key
    }

    /// Root of the temporary storage directory, for filesystem environments.
    pub fn storage_root(&self) -> Option<&Path> {
        self.storage_dir.as_ref().map(TempDir::path)
    }

    /// Submits an envelope with the correct API key.
    pub async fn post_webhook(&self, envelope: &Value) -> Result<TestResponse> {
        let key = self.api_key().to_string();
        self.post_raw(serde_json::to_vec(envelope)?, Some(&key)).await
    }

    /// Submits a raw body with an optional API key.
    pub async fn post_raw(&self, body: impl Into<Body>, api_key: Option<&str>) -> Result<TestResponse> {
        self.request(Method::POST, "/webhook/btg", body.into(), api_key).await
    }

    /// Lists stored webhooks with an optional API key.
    pub async fn list_webhooks(&self, api_key: Option<&str>) -> Result<TestResponse> {
        self.request(Method::GET, "/webhook/list", Body::empty(), api_key).await
    }

    /// Issues an unauthenticated GET.
    pub async fn get(&self, path: &str) -> Result<TestResponse> {
        self.request(Method::GET, path, Body::empty(), None).await
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Body,
        api_key: Option<&str>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri).header("content-type", "application/json");
        if let Some(key) = api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        let request = builder.body(body)?;

        let response = self.router().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok(TestResponse { status, headers, body })
    }

    /// Directory of a partition under the temporary root.
    pub fn partition_dir(&self, webhook_type: WebhookType) -> Result<PathBuf> {
        let root = self.storage_root().context("environment has no storage directory")?;
        Ok(root.join(webhook_type.as_str()))
    }

    /// Names of the files in a partition, sorted. Empty if it does not exist.
    pub fn files_in(&self, webhook_type: WebhookType) -> Result<Vec<String>> {
        let dir = self.partition_dir(webhook_type)?;
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Total number of files across all partitions.
    pub fn file_count(&self) -> Result<usize> {
        WebhookType::ALL.into_iter().map(|t| self.files_in(t).map(|f| f.len())).sum()
    }

    /// Reads a stored record file as JSON.
    pub fn read_record(&self, webhook_type: WebhookType, name: &str) -> Result<Value> {
        let path = self.partition_dir(webhook_type)?.join(name);
        let contents = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes arbitrary bytes into a partition, bypassing the store.
    pub fn write_file(&self, webhook_type: WebhookType, name: &str, contents: &[u8]) -> Result<()> {
        let dir = self.partition_dir(webhook_type)?;
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join(name), contents)?;
        Ok(())
    }
}
