//! Filesystem adapter: one directory per partition, one JSON file per record.
//!
//! Records are pretty-printed UTF-8 JSON. A write goes to a hidden temp file
//! in the partition that is fsynced and then persisted without clobbering, so
//! the final name either does not exist or holds a complete record, and an
//! existing name is never replaced.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use super::{RecordStore, StoreFuture};
use crate::{
    error::{CoreError, Result},
    models::{ListedRecord, StoredRecord, WebhookType},
};

/// Record store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    root: PathBuf,
}

impl FileRecordStore {
    /// Creates a store rooted at `root`. Nothing is created until first use.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one partition.
    pub fn partition_dir(&self, partition: WebhookType) -> PathBuf {
        self.root.join(partition.as_str())
    }
}

impl RecordStore for FileRecordStore {
    fn ensure_partition(&self, partition: WebhookType) -> StoreFuture<'_, ()> {
        let dir = self.partition_dir(partition);
        Box::pin(async move { run_blocking(move || Ok(fs::create_dir_all(&dir)?)).await })
    }

    fn put<'a>(
        &'a self,
        partition: WebhookType,
        name: &'a str,
        record: &'a StoredRecord,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            validate_name(name)?;
            let body = serde_json::to_vec_pretty(record)?;
            let dir = self.partition_dir(partition);
            let name = name.to_string();

            run_blocking(move || write_new_file(&dir, &name, &body)).await
        })
    }

    fn list(&self, partition: WebhookType) -> StoreFuture<'_, Vec<ListedRecord>> {
        let dir = self.partition_dir(partition);
        Box::pin(async move { run_blocking(move || read_partition(&dir)).await })
    }

    fn health_check(&self) -> StoreFuture<'_, ()> {
        let root = self.root.clone();
        Box::pin(async move {
            run_blocking(move || {
                fs::create_dir_all(&root)?;
                if fs::metadata(&root)?.is_dir() {
                    Ok(())
                } else {
                    Err(CoreError::Storage(format!("{} is not a directory", root.display())))
                }
            })
            .await
        })
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| CoreError::Storage(format!("blocking storage task failed: {e}")))?
}

fn validate_name(name: &str) -> Result<()> {
    let valid = name.ends_with(".json")
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..");

    if valid {
        Ok(())
    } else {
        Err(CoreError::Storage(format!("invalid record name: {name:?}")))
    }
}

fn write_new_file(dir: &Path, name: &str, body: &[u8]) -> Result<()> {
    let target = dir.join(name);

    let mut staging = NamedTempFile::new_in(dir)?;
    staging.write_all(body)?;
    staging.as_file().sync_all()?;

    match staging.persist_noclobber(&target) {
        Ok(_) => {
            sync_dir(dir)?;
            debug!(path = %target.display(), bytes = body.len(), "Record written");
            Ok(())
        },
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
            Err(CoreError::Conflict(name.to_string()))
        },
        Err(e) => Err(e.error.into()),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

fn read_partition(dir: &Path) -> Result<Vec<ListedRecord>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') || !name.ends_with(".json") {
            continue;
        }
        names.push(name);
    }
    // Lexicographic, so same-millisecond names order by account, not arrival.
    names.sort();

    names
        .into_iter()
        .map(|file_name| -> Result<ListedRecord> {
            let bytes = fs::read(dir.join(&file_name))?;
            let data = serde_json::from_slice(&bytes)?;
            Ok(ListedRecord { file_name, data })
        })
        .collect()
}
