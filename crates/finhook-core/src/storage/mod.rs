//! Storage port for webhook records.
//!
//! Handlers never touch the filesystem or database directly. They go through
//! `RecordStore`, which has a filesystem adapter (the default deployment), a
//! PostgreSQL adapter, and an in-memory adapter for tests.
//!
//! Every partition corresponds to one `WebhookType`. Records are write-once:
//! `put` fails with `CoreError::Conflict` instead of replacing an existing
//! name.

use std::{future::Future, pin::Pin};

use crate::{
    error::Result,
    models::{ListedRecord, StoredRecord, WebhookType},
};

pub mod filesystem;
pub mod memory;
pub mod postgres;

pub use filesystem::FileRecordStore;
pub use memory::MemoryRecordStore;
pub use postgres::PostgresRecordStore;

/// Boxed future returned by `RecordStore` operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Storage operations required by the ingestion service.
pub trait RecordStore: Send + Sync + 'static {
    /// Makes sure the partition can accept records.
    fn ensure_partition(&self, partition: WebhookType) -> StoreFuture<'_, ()>;

    /// Durably writes a record under `name`.
    ///
    /// Fails with `CoreError::Conflict` if the name is already taken.
    fn put<'a>(
        &'a self,
        partition: WebhookType,
        name: &'a str,
        record: &'a StoredRecord,
    ) -> StoreFuture<'a, ()>;

    /// Reads every record in a partition.
    ///
    /// A partition that was never created yields an empty list. Any record
    /// that cannot be read or decoded fails the whole call.
    fn list(&self, partition: WebhookType) -> StoreFuture<'_, Vec<ListedRecord>>;

    /// Lightweight connectivity check for health probes.
    fn health_check(&self) -> StoreFuture<'_, ()>;
}
