//! Core domain models and storage for webhook ingestion.
//!
//! Provides the provider envelope and stored record types, the error
//! taxonomy, clock abstraction, the `RecordStore` storage port with its
//! adapters, and the ingestion service that ties them together.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ingest;
pub mod models;
pub mod storage;
pub mod time;

pub use error::{CoreError, Result};
pub use ingest::IngestionService;
pub use models::{
    Listing, ListedRecord, Metadata, ProviderError, Receipt, StoredRecord, Submission,
    WebhookEnvelope, WebhookResponse, WebhookType,
};
pub use storage::{FileRecordStore, MemoryRecordStore, PostgresRecordStore, RecordStore};
pub use time::{Clock, RealClock, StampAllocator, TestClock};
