//! SQLite storage backend implementation
//!
//! This module provides a SQLite-based implementation of the `Repository` trait.
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Better concurrency for reads during writes
//! - **Connection pooling**: Safe for concurrent use without external locking
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! ## Schema
//!
//! A single `metrics` table keyed by metric name stores the kind together
//! with an integer `delta` and a float `value` column. Because the table is
//! keyed by name alone, a gauge and a counter cannot share a name here: the
//! last write decides the stored kind and reads of the other kind fail with
//! [`StorageError::TypeMismatch`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Executor, Pool, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::Repository;
use super::error::{StorageError, StorageResult};
use super::schema::{Metric, MetricKind};

/// Upper bound for the liveness probe
const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// SQLSTATE data exception, reported for gauge values SQLite cannot hold
const NAN_VALUE_CODE: &str = "22000";

/// SQLite storage backend
pub struct SqliteStorage {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteStorage {
    /// Create a new SQLite backend
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Verify the connection with a ping
    /// 3. Run migrations to create tables
    ///
    /// Construction fails if either the ping or the migrations fail.
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let storage = Self {
            pool,
            db_path: db_path_str,
        };

        storage.ping().await?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&storage.pool).await?;
        info!("database migrations complete");

        Ok(storage)
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Close the pool and release all connections
    pub async fn close(&self) {
        info!("closing SQLite backend");
        self.pool.close().await;
    }
}

async fn upsert_gauge<'e, E>(executor: E, name: &str, value: f64) -> StorageResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    // SQLite stores a NaN REAL as NULL, which could not be read back
    if value.is_nan() {
        return Err(StorageError::Database {
            code: Some(NAN_VALUE_CODE.to_string()),
            message: format!("gauge {name}: NaN cannot be stored"),
        });
    }

    sqlx::query(
        r#"
        INSERT INTO metrics (id, mtype, value)
        VALUES (?, 'gauge', ?)
        ON CONFLICT (id) DO UPDATE SET
            mtype = excluded.mtype,
            value = excluded.value
        "#,
    )
    .bind(name)
    .bind(value)
    .execute(executor)
    .await?;
    Ok(())
}

async fn upsert_counter<'e, E>(executor: E, name: &str, delta: i64) -> StorageResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    // a row that held a gauge starts counting from zero. Totals wrap on
    // overflow like the in-memory backends; a plain `+` would turn into a REAL.
    sqlx::query(
        r#"
        INSERT INTO metrics (id, mtype, delta)
        VALUES (?, 'counter', ?)
        ON CONFLICT (id) DO UPDATE SET
            mtype = excluded.mtype,
            delta = CASE
                WHEN metrics.mtype <> 'counter' OR metrics.delta IS NULL THEN excluded.delta
                WHEN excluded.delta > 0
                    AND metrics.delta > 9223372036854775807 - excluded.delta
                    THEN (metrics.delta - 9223372036854775807 - 1)
                        + (excluded.delta - 9223372036854775807 - 1)
                WHEN excluded.delta < 0
                    AND metrics.delta < -9223372036854775807 - 1 - excluded.delta
                    THEN (metrics.delta + 9223372036854775807 + 1)
                        + (excluded.delta + 9223372036854775807 + 1)
                ELSE metrics.delta + excluded.delta
            END
        "#,
    )
    .bind(name)
    .bind(delta)
    .execute(executor)
    .await?;
    Ok(())
}

/// Check the stored kind and extract the requested value column
fn stored_value<T>(
    name: &str,
    requested: MetricKind,
    row: Option<(String, Option<T>)>,
) -> StorageResult<T> {
    let (mtype, value) = row.ok_or_else(|| StorageError::NotFound {
        kind: requested,
        name: name.to_string(),
    })?;

    if mtype != requested.as_str() {
        return Err(StorageError::TypeMismatch {
            name: name.to_string(),
            expected: requested,
            found: mtype,
        });
    }

    value.ok_or_else(|| StorageError::NullValue {
        name: name.to_string(),
        kind: requested,
    })
}

#[async_trait]
impl Repository for SqliteStorage {
    #[instrument(skip(self))]
    async fn update_gauge(&self, name: &str, value: f64) -> StorageResult<()> {
        upsert_gauge(&self.pool, name, value).await
    }

    #[instrument(skip(self))]
    async fn update_counter(&self, name: &str, delta: i64) -> StorageResult<()> {
        upsert_counter(&self.pool, name, delta).await
    }

    #[instrument(skip(self))]
    async fn get_gauge(&self, name: &str) -> StorageResult<f64> {
        let row: Option<(String, Option<f64>)> =
            sqlx::query_as("SELECT mtype, value FROM metrics WHERE id = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        stored_value(name, MetricKind::Gauge, row)
    }

    #[instrument(skip(self))]
    async fn get_counter(&self, name: &str) -> StorageResult<i64> {
        let row: Option<(String, Option<i64>)> =
            sqlx::query_as("SELECT mtype, delta FROM metrics WHERE id = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        stored_value(name, MetricKind::Counter, row)
    }

    async fn list_gauge_names(&self) -> StorageResult<Vec<String>> {
        let names: Vec<(String,)> = sqlx::query_as("SELECT id FROM metrics WHERE mtype = ?")
            .bind(MetricKind::Gauge.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    async fn list_counter_names(&self) -> StorageResult<Vec<String>> {
        let names: Vec<(String,)> = sqlx::query_as("SELECT id FROM metrics WHERE mtype = ?")
            .bind(MetricKind::Counter.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    #[instrument(skip(self))]
    async fn ping(&self) -> StorageResult<()> {
        match tokio::time::timeout(PING_TIMEOUT, sqlx::query("SELECT 1").execute(&self.pool)).await
        {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => {
                warn!("ping timed out after {:?}", PING_TIMEOUT);
                Err(StorageError::UnhealthyBackend(format!(
                    "no answer within {:?}",
                    PING_TIMEOUT
                )))
            }
        }
    }

    #[instrument(skip(self, metrics), fields(count = metrics.len()))]
    async fn update_batch(&self, metrics: &[Metric]) -> StorageResult<()> {
        if metrics.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for metric in metrics {
            match metric {
                Metric::Gauge { name, value } => upsert_gauge(&mut *tx, name, *value).await?,
                Metric::Counter { name, delta } => upsert_counter(&mut *tx, name, *delta).await?,
            }
        }

        tx.commit().await?;

        debug!("batch update complete");
        Ok(())
    }
}
