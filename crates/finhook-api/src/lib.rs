//! HTTP API for receiving and browsing provider webhooks.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;

pub use config::{Config, StorageBackend};
pub use error::ApiError;
pub use server::{create_router, serve, start_server};
pub use state::AppState;
