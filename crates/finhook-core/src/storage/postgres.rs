//! PostgreSQL adapter: one row per record in `webhook_records`.
//!
//! Partitions are a column rather than a table, so `ensure_partition` has
//! nothing to do. The `(partition, file_name)` pair is unique; a duplicate
//! insert surfaces as `CoreError::Conflict`.
//!
//! Payloads live in a `JSON` column, not `JSONB`, and travel as text so the
//! envelope keeps its original key order.

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{RecordStore, StoreFuture};
use crate::{
    error::Result,
    models::{ListedRecord, StoredRecord, WebhookType},
};

/// Record store backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Wraps an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool and verifies it with a trivial query.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Creates the records table and index if they do not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS webhook_records (
                id UUID PRIMARY KEY,
                partition TEXT NOT NULL,
                file_name TEXT NOT NULL,
                payload JSON NOT NULL,
                received_at TIMESTAMPTZ NOT NULL,
                UNIQUE(partition, file_name)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_webhook_records_partition
            ON webhook_records(partition, received_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl RecordStore for PostgresRecordStore {
    fn ensure_partition(&self, _partition: WebhookType) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    fn put<'a>(
        &'a self,
        partition: WebhookType,
        name: &'a str,
        record: &'a StoredRecord,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let id = Uuid::new_v4();
            let payload = serde_json::to_string(record)?;
            sqlx::query(
                r"
                INSERT INTO webhook_records (id, partition, file_name, payload, received_at)
                VALUES ($1, $2, $3, $4::json, $5)
                ",
            )
            .bind(id)
            .bind(partition.as_str())
            .bind(name)
            .bind(payload)
            .bind(record.timestamp)
            .execute(&self.pool)
            .await?;

            debug!(record_id = %id, file_name = name, "Record inserted");
            Ok(())
        })
    }

    fn list(&self, partition: WebhookType) -> StoreFuture<'_, Vec<ListedRecord>> {
        Box::pin(async move {
            let rows: Vec<(String, String)> = sqlx::query_as(
                r"
                SELECT file_name, payload::text
                FROM webhook_records
                WHERE partition = $1
                ORDER BY received_at, file_name
                ",
            )
            .bind(partition.as_str())
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter()
                .map(|(file_name, payload)| -> Result<ListedRecord> {
                    Ok(ListedRecord { file_name, data: serde_json::from_str(&payload)? })
                })
                .collect()
        })
    }

    fn health_check(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
    }
}
