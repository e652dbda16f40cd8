//! Error types and result handling for ingestion and storage.
//!
//! Separates caller mistakes (`InvalidPayload`) from storage and
//! serialization failures so the HTTP layer can map them to 400 or 500.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for ingestion and storage operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The envelope is missing required fields or has the wrong shape.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A record with the same name already exists in the partition.
    #[error("Record conflict: {0}")]
    Conflict(String),

    /// Storage backend failure that is not plain I/O.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Returns whether the error was caused by the caller's payload.
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidPayload(_))
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict(format!("unique constraint violation: {db_err}"))
            },
            _ => Self::Database(err.to_string()),
        }
    }
}
