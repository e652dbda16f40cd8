//! End-to-end tests over a real TCP listener.
//!
//! Drives the full stack with an HTTP client: authentication, submission,
//! storage on disk, and listing back.

use anyhow::Result;
use finhook_core::WebhookType;
use finhook_testing::{EnvelopeBuilder, TestEnv};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

struct RunningServer {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    async fn start(env: &TestEnv) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(finhook_api::serve(listener, env.router(), async move {
            let _ = rx.await;
        }));

        Ok(Self { base_url, shutdown: Some(tx), handle })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await??;
        Ok(())
    }
}

#[tokio::test]
async fn submit_then_list_over_http() -> Result<()> {
    let env = TestEnv::new()?;
    let server = RunningServer::start(&env).await?;
    let client = reqwest::Client::new();

    let operations = EnvelopeBuilder::operations("4242").period("2025-05-01", "2025-05-31").build();
    let positions = EnvelopeBuilder::positions().build();

    for envelope in [&operations, &positions] {
        let response = client
            .post(server.url("/webhook/btg"))
            .header("x-api-key", env.api_key())
            .json(envelope)
            .send()
            .await?;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
    }

    let listing: Value = client
        .get(server.url("/webhook/list"))
        .header("x-api-key", env.api_key())
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    assert_eq!(listing["operations-by-account"][0]["data"]["data"], operations);
    assert_eq!(listing["positions-by-partner"][0]["data"]["data"], positions);
    assert_eq!(env.files_in(WebhookType::OperationsByAccount)?.len(), 1);
    assert_eq!(env.files_in(WebhookType::PositionsByPartner)?.len(), 1);

    server.stop().await
}

#[tokio::test]
async fn rejected_requests_leave_no_files() -> Result<()> {
    let env = TestEnv::new()?;
    let server = RunningServer::start(&env).await?;
    let client = reqwest::Client::new();

    let unauthorized = client
        .post(server.url("/webhook/btg"))
        .json(&EnvelopeBuilder::operations("1").build())
        .send()
        .await?;
    assert_eq!(unauthorized.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: Value = unauthorized.json().await?;
    assert_eq!(body, json!({"message": "API Key inválida ou não fornecida"}));

    let invalid = client
        .post(server.url("/webhook/btg"))
        .header("x-api-key", env.api_key())
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(invalid.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = invalid.json().await?;
    assert_eq!(body, json!({"message": "Dados inválidos ou incompletos"}));

    assert_eq!(env.file_count()?, 0);

    server.stop().await
}

#[tokio::test]
async fn concurrent_submissions_get_distinct_records() -> Result<()> {
    let env = TestEnv::new()?;
    let server = RunningServer::start(&env).await?;
    let client = reqwest::Client::new();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let client = client.clone();
        let url = server.url("/webhook/btg");
        let key = env.api_key().to_string();
        tasks.push(tokio::spawn(async move {
            client
                .post(url)
                .header("x-api-key", key)
                .json(&EnvelopeBuilder::operations("77").build())
                .send()
                .await
                .map(|r| r.status())
        }));
    }
    for task in tasks {
        assert_eq!(task.await??, reqwest::StatusCode::OK);
    }

    assert_eq!(env.files_in(WebhookType::OperationsByAccount)?.len(), 16);

    server.stop().await
}

#[tokio::test]
async fn probes_answer_without_credentials() -> Result<()> {
    let env = TestEnv::new()?;
    let server = RunningServer::start(&env).await?;

    let health = reqwest::get(server.url("/health")).await?;
    assert_eq!(health.status(), reqwest::StatusCode::OK);

    let live: Value = reqwest::get(server.url("/live")).await?.json().await?;
    assert_eq!(live["status"], "alive");

    server.stop().await
}
