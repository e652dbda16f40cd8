//! finhook webhook receiver.
//!
//! Loads configuration, opens the configured record store, and serves the
//! HTTP API until CTRL+C or SIGTERM.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use finhook_api::{AppState, Config, StorageBackend};
use finhook_core::{FileRecordStore, PostgresRecordStore, RealClock, RecordStore};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config.rust_log)?;

    info!(
        addr = %format!("{}:{}", config.host, config.port),
        backend = ?config.storage_backend,
        api_key = %config.api_key_masked(),
        request_timeout_secs = config.request_timeout,
        "Configuration loaded"
    );

    let store = open_store(&config).await?;
    let state = AppState::new(store, Arc::new(RealClock::new()), &config.api_key);

    finhook_api::start_server(state, &config).await?;

    info!("finhook shutdown complete");
    Ok(())
}

/// Initializes tracing, preferring `RUST_LOG` over the configured filter.
fn init_tracing(default_filter: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("Invalid log filter")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match config.storage_backend {
        StorageBackend::Filesystem => {
            let store = FileRecordStore::new(&config.storage_root);
            store.health_check().await.with_context(|| {
                format!("Storage root {} is not usable", config.storage_root.display())
            })?;
            info!(root = %config.storage_root.display(), "Filesystem storage ready");
            Ok(Arc::new(store))
        },
        StorageBackend::Postgres => {
            let store = connect_postgres(config).await?;
            store.migrate().await.context("Failed to create webhook_records table")?;
            info!("Database storage ready");
            Ok(Arc::new(store))
        },
    }
}

/// Connects to PostgreSQL, retrying while the database comes up.
async fn connect_postgres(config: &Config) -> Result<PostgresRecordStore> {
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);

    let url = config.database_url.as_deref().context("database_url is not set")?;
    let mut retries = 0;

    loop {
        match PostgresRecordStore::connect(url, config.database_max_connections).await {
            Ok(store) => {
                info!(database_url = ?config.database_url_masked(), "Database connection established");
                return Ok(store);
            },
            Err(e) if retries < MAX_RETRIES => {
                retries += 1;
                warn!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    error = %e,
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("Failed to connect to database after retries");
            },
        }
    }
}
