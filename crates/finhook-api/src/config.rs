//! Configuration management for the finhook webhook receiver.

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.toml";

/// Where accepted webhooks are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON files under `storage_root`
    Filesystem,
    /// Rows in PostgreSQL at `database_url`
    Postgres,
}

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`config.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// # Example
///
/// ```no_run
/// use finhook_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
///
/// println!("Server will bind to {}:{}", config.host, config.port);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout", alias = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,
    /// Largest accepted request body in bytes.
    ///
    /// Environment variable: `MAX_BODY_BYTES`
    #[serde(default = "default_max_body_bytes", alias = "MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    // Authentication
    /// Shared secret expected in the `x-api-key` header.
    ///
    /// Environment variable: `API_KEY`
    #[serde(default = "default_api_key", alias = "API_KEY")]
    pub api_key: String,

    // Storage
    /// Storage backend for accepted webhooks.
    ///
    /// Environment variable: `STORAGE_BACKEND`
    #[serde(default = "default_storage_backend", alias = "STORAGE_BACKEND")]
    pub storage_backend: StorageBackend,
    /// Root directory for the filesystem backend.
    ///
    /// Environment variable: `STORAGE_ROOT`
    #[serde(default = "default_storage_root", alias = "STORAGE_ROOT")]
    pub storage_root: PathBuf,
    /// PostgreSQL connection URL for the postgres backend.
    ///
    /// Environment variable: `DATABASE_URL`
    #[serde(default, alias = "DATABASE_URL")]
    pub database_url: Option<String>,
    /// Maximum number of database connections in the pool.
    ///
    /// Environment variable: `DATABASE_MAX_CONNECTIONS`
    #[serde(default = "default_max_connections", alias = "DATABASE_MAX_CONNECTIONS")]
    pub database_max_connections: u32,

    // Logging
    /// Log level configuration.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides.
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Serialized::defaults(Self::default()))
                .merge(Toml::file(CONFIG_FILE))
                .merge(Env::prefixed("")),
        )
    }

    /// Extracts and validates configuration from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Parse server socket address from host and port configuration.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// API key with everything but the first two characters masked.
    pub fn api_key_masked(&self) -> String {
        let visible: String = self.api_key.chars().take(2).collect();
        format!("{visible}***")
    }

    /// Get database URL with password masked for logging.
    pub fn database_url_masked(&self) -> Option<String> {
        let url = self.database_url.as_ref()?;
        if let Some(at_pos) = url.find('@') {
            if let Some(colon_pos) = url[..at_pos].rfind(':') {
                let mut masked = url.clone();
                masked.replace_range(colon_pos + 1..at_pos, "***");
                return Some(masked);
            }
        }
        Some(url.clone())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.max_body_bytes == 0 {
            anyhow::bail!("max_body_bytes must be greater than 0");
        }

        if self.api_key.trim().is_empty() {
            anyhow::bail!("api_key must not be empty");
        }

        match self.storage_backend {
            StorageBackend::Filesystem => {
                if self.storage_root.as_os_str().is_empty() {
                    anyhow::bail!("storage_root must not be empty");
                }
            },
            StorageBackend::Postgres => {
                if self.database_url.as_deref().map_or(true, str::is_empty) {
                    anyhow::bail!("database_url is required for the postgres backend");
                }
                if self.database_max_connections == 0 {
                    anyhow::bail!("database_max_connections must be greater than 0");
                }
            },
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
            api_key: default_api_key(),
            storage_backend: default_storage_backend(),
            storage_root: default_storage_root(),
            database_url: None,
            database_max_connections: default_max_connections(),
            rust_log: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_api_key() -> String {
    "finacap2025".to_string()
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Filesystem
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("webhook-data")
}

fn default_max_connections() -> u32 {
    5
}

fn default_log_level() -> String {
    "info,finhook=debug,tower_http=debug".to_string()
}
