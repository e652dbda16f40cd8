//! Shared application state handed to every handler.

use std::sync::Arc;

use finhook_core::{Clock, IngestionService, RecordStore};
use sha2::{Digest, Sha256};

/// State shared by all routes.
#[derive(Clone)]
pub struct AppState {
    /// Ingestion service shared by every request
    pub ingestion: IngestionService,
    /// Clock used for health timestamps
    pub clock: Arc<dyn Clock>,
    api_key_digest: [u8; 32],
}

impl AppState {
    /// Builds state around a store, a clock, and the expected API key.
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, api_key: &str) -> Self {
        Self {
            ingestion: IngestionService::new(store, Arc::clone(&clock)),
            clock,
            api_key_digest: digest(api_key),
        }
    }

    /// Storage backing the ingestion service.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        self.ingestion.store()
    }

    /// Whether `candidate` matches the configured API key.
    ///
    /// Compares SHA-256 digests so timing does not depend on how many
    /// leading characters of the key were guessed.
    pub fn api_key_matches(&self, candidate: &str) -> bool {
        digest(candidate) == self.api_key_digest
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}
