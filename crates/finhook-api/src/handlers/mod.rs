//! HTTP request handlers.
//!
//! - `webhook` - submitting and listing provider webhooks
//! - `health` - liveness and storage health probes

pub mod health;
pub mod webhook;

pub use health::{health_check, liveness_check};
pub use webhook::{list_webhooks, submit_webhook};
