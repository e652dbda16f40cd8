//! In-memory record store for testing.
//!
//! Keeps partitions in a `BTreeMap` behind an async lock and supports
//! injecting read and write failures to exercise error paths without a disk.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tokio::sync::RwLock;

use super::{RecordStore, StoreFuture};
use crate::{
    error::CoreError,
    models::{ListedRecord, StoredRecord, WebhookType},
};

type Partitions = BTreeMap<WebhookType, BTreeMap<String, StoredRecord>>;

/// Mock storage holding records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    partitions: Arc<RwLock<Partitions>>,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

impl MemoryRecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `put` fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Makes every subsequent `list` and health check fail with a storage
    /// error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Release);
    }

    /// Seeds a record directly, bypassing conflict checks.
    pub async fn insert(&self, partition: WebhookType, name: &str, record: StoredRecord) {
        self.partitions
            .write()
            .await
            .entry(partition)
            .or_default()
            .insert(name.to_string(), record);
    }

    /// Names stored in a partition, sorted.
    pub async fn names(&self, partition: WebhookType) -> Vec<String> {
        self.partitions
            .read()
            .await
            .get(&partition)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Total number of records across partitions.
    pub async fn len(&self) -> usize {
        self.partitions.read().await.values().map(BTreeMap::len).sum()
    }

    /// Whether no record has been stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl RecordStore for MemoryRecordStore {
    fn ensure_partition(&self, partition: WebhookType) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.partitions.write().await.entry(partition).or_default();
            Ok(())
        })
    }

    fn put<'a>(
        &'a self,
        partition: WebhookType,
        name: &'a str,
        record: &'a StoredRecord,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            if self.fail_writes.load(Ordering::Acquire) {
                return Err(CoreError::Storage("injected write failure".into()));
            }

            let mut partitions = self.partitions.write().await;
            let records = partitions.get_mut(&partition).ok_or_else(|| {
                CoreError::Storage(format!("partition {partition} does not exist"))
            })?;

            if records.contains_key(name) {
                return Err(CoreError::Conflict(name.to_string()));
            }
            records.insert(name.to_string(), record.clone());
            Ok(())
        })
    }

    fn list(&self, partition: WebhookType) -> StoreFuture<'_, Vec<ListedRecord>> {
        Box::pin(async move {
            if self.fail_reads.load(Ordering::Acquire) {
                return Err(CoreError::Storage("injected read failure".into()));
            }

            let partitions = self.partitions.read().await;
            Ok(partitions
                .get(&partition)
                .map(|records| {
                    records
                        .iter()
                        .map(|(name, record)| ListedRecord {
                            file_name: name.clone(),
                            data: record.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    fn health_check(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if self.fail_reads.load(Ordering::Acquire) {
                return Err(CoreError::Storage("injected read failure".into()));
            }
            Ok(())
        })
    }
}
