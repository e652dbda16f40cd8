//! Ingestion service: validate, classify, stamp, and persist envelopes.
//!
//! Callers are expected to have authenticated the request already. The
//! service owns the stamp allocator, so a single instance should be shared by
//! every request in the process.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::{CoreError, Result},
    models::{record_file_name, Listing, Receipt, Submission, WebhookType},
    storage::RecordStore,
    time::{Clock, StampAllocator},
};

/// Upper bound on names tried when a write hits an existing record.
pub const MAX_NAME_ATTEMPTS: u32 = 8;

/// Turns accepted envelopes into stored records.
#[derive(Clone)]
pub struct IngestionService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    stamps: Arc<StampAllocator>,
}

impl IngestionService {
    /// Creates a service writing to `store` with timestamps from `clock`.
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock, stamps: Arc::new(StampAllocator::new()) }
    }

    /// Storage backing this service.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Validates and persists one envelope.
    ///
    /// # Errors
    ///
    /// - `CoreError::InvalidPayload` if the envelope lacks `response.url`.
    ///   Nothing is written in that case.
    /// - `CoreError::Conflict` if every candidate name was already taken.
    /// - Any storage or serialization error from the backend.
    #[instrument(
        name = "submit",
        skip_all,
        fields(webhook_type = tracing::field::Empty, file_name = tracing::field::Empty)
    )]
    pub async fn submit(&self, raw: Value) -> Result<Receipt> {
        let submission = Submission::parse(raw)?;
        let webhook_type = submission.webhook_type();
        tracing::Span::current().record("webhook_type", webhook_type.as_str());

        if !submission.provider_errors().is_empty() {
            warn!(
                count = submission.provider_errors().len(),
                errors = ?submission.provider_errors(),
                "Provider reported errors alongside the file"
            );
        }

        self.store.ensure_partition(webhook_type).await?;

        let account = submission.account_number().map(str::to_string);
        let mut stamp = self.next_stamp();
        let mut file_name = submission.file_name(stamp);
        let mut record = submission.into_record(stamp_to_timestamp(stamp)?);
        let mut attempt = 1;

        loop {
            match self.store.put(webhook_type, &file_name, &record).await {
                Ok(()) => break,
                Err(CoreError::Conflict(existing)) if attempt < MAX_NAME_ATTEMPTS => {
                    warn!(file_name = %existing, attempt, "Record name taken, allocating a new stamp");
                    attempt += 1;
                    stamp = self.next_stamp();
                    file_name = record_file_name(webhook_type, account.as_deref(), stamp);
                    record.timestamp = stamp_to_timestamp(stamp)?;
                },
                Err(e) => return Err(e),
            }
        }

        tracing::Span::current().record("file_name", file_name.as_str());
        info!(
            download_url = %record.metadata.download_url,
            account_number = %record.metadata.account_number,
            "Webhook stored"
        );

        Ok(Receipt { file_name, webhook_type, metadata: record.metadata })
    }

    /// Reads back every stored record grouped by type.
    ///
    /// Every known type is present in the result, with an empty list when
    /// nothing was stored for it.
    ///
    /// # Errors
    ///
    /// Fails as a whole if any partition or record cannot be read.
    #[instrument(name = "list", skip_all)]
    pub async fn list(&self) -> Result<Listing> {
        let mut listing = Listing::new();
        for webhook_type in WebhookType::ALL {
            let records = self.store.list(webhook_type).await?;
            debug!(webhook_type = %webhook_type, count = records.len(), "Partition read");
            listing.insert(webhook_type, records);
        }
        Ok(listing)
    }

    fn next_stamp(&self) -> i64 {
        self.stamps.next(self.clock.now_millis())
    }
}

fn stamp_to_timestamp(stamp: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(stamp)
        .ok_or_else(|| CoreError::Storage(format!("stamp {stamp} is out of range")))
}
