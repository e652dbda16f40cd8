//! HTTP middleware for authentication.
//!
//! Provides the shared-secret API key check that guards the webhook routes.
pub mod auth;
