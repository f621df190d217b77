//! Snapshot persistence for in-memory repositories
//!
//! [`SnapshotStorage`] mirrors the full state of an inner [`Repository`] to a
//! JSON file so that an in-memory deployment survives restarts.
//!
//! ## Save modes
//!
//! - **Synchronous** (`interval` of zero): the snapshot is rewritten after
//!   every successful mutating call on the wrapper.
//! - **Periodic** (non-zero `interval`): a background task rewrites the
//!   snapshot on every tick. The task lives as long as the wrapper.
//!
//! A failed synchronous save never fails the caller's write. The error is
//! logged and handed to the optional error hook instead.
//!
//! ## Loading
//!
//! [`SnapshotStorage::load`] validates every record before applying any of
//! them, so a file with an unknown metric kind is rejected as a whole.
//! Counter totals are replayed through `update_counter`, which only restores
//! them exactly when the inner repository starts out empty.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace};

use super::backend::Repository;
use super::error::{StorageError, StorageResult};
use super::schema::{Metric, MetricRecord};

/// Callback receiving snapshot failures that are not returned to a caller
pub type SaveErrorHook = Arc<dyn Fn(&StorageError) + Send + Sync>;

/// Repository wrapper persisting its state to a snapshot file
pub struct SnapshotStorage<R: ?Sized> {
    inner: Arc<R>,
    path: PathBuf,
    sync_save: bool,
    on_error: Option<SaveErrorHook>,
    ticker: Option<JoinHandle<()>>,
}

impl<R: Repository + ?Sized + 'static> SnapshotStorage<R> {
    /// Wrap `inner`, saving to `path`
    ///
    /// A zero `interval` saves after every write, otherwise a periodic save
    /// task is started (this requires a Tokio runtime).
    pub fn new(inner: Arc<R>, path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self::build(inner, path.into(), interval, None)
    }

    /// Like [`SnapshotStorage::new`], reporting swallowed save failures to
    /// `hook`
    pub fn with_error_hook(
        inner: Arc<R>,
        path: impl Into<PathBuf>,
        interval: Duration,
        hook: SaveErrorHook,
    ) -> Self {
        Self::build(inner, path.into(), interval, Some(hook))
    }

    fn build(
        inner: Arc<R>,
        path: PathBuf,
        interval: Duration,
        on_error: Option<SaveErrorHook>,
    ) -> Self {
        let sync_save = interval.is_zero();

        let ticker = if sync_save {
            debug!("saving snapshots to {} after every write", path.display());
            None
        } else {
            debug!(
                "saving snapshots to {} every {:?}",
                path.display(),
                interval
            );
            Some(tokio::spawn(run_periodic_save(
                inner.clone(),
                path.clone(),
                interval,
                on_error.clone(),
            )))
        };

        Self {
            inner,
            path,
            sync_save,
            on_error,
            ticker,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether snapshots are written after every write
    pub fn is_synchronous(&self) -> bool {
        self.sync_save
    }

    /// Write the current state of the inner repository to the snapshot file
    pub async fn save(&self) -> StorageResult<()> {
        save_snapshot(self.inner.as_ref(), &self.path).await
    }

    /// Replay the snapshot at `path` into the inner repository
    ///
    /// Returns the number of metrics applied. Nothing is applied if any record
    /// is invalid.
    #[instrument(skip_all)]
    pub async fn load(&self, path: impl AsRef<Path>) -> StorageResult<usize> {
        debug!("loading snapshot from {}", path.as_ref().display());
        let content = tokio::fs::read(path.as_ref()).await?;
        let records: Vec<MetricRecord> = serde_json::from_slice(&content)?;

        let metrics = records
            .into_iter()
            .map(Metric::try_from)
            .collect::<StorageResult<Vec<_>>>()?;

        for metric in &metrics {
            match metric {
                Metric::Gauge { name, value } => self.inner.update_gauge(name, *value).await?,
                Metric::Counter { name, delta } => {
                    self.inner.update_counter(name, *delta).await?
                }
            }
        }

        info!("restored {} metrics from snapshot", metrics.len());
        Ok(metrics.len())
    }

    /// Load the snapshot from this wrapper's own path
    ///
    /// A missing file is treated as an empty snapshot.
    pub async fn restore(&self) -> StorageResult<usize> {
        match self.load(&self.path).await {
            Err(StorageError::IoError(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("no snapshot at {}, starting empty", self.path.display());
                Ok(0)
            }
            result => result,
        }
    }

    async fn after_write(&self) {
        if !self.sync_save {
            return;
        }

        if let Err(err) = self.save().await {
            report_save_error(&self.on_error, &err);
        }
    }
}

impl<R: ?Sized> Drop for SnapshotStorage<R> {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

#[async_trait]
impl<R: Repository + ?Sized + 'static> Repository for SnapshotStorage<R> {
    async fn update_gauge(&self, name: &str, value: f64) -> StorageResult<()> {
        self.inner.update_gauge(name, value).await?;
        self.after_write().await;
        Ok(())
    }

    async fn update_counter(&self, name: &str, delta: i64) -> StorageResult<()> {
        self.inner.update_counter(name, delta).await?;
        self.after_write().await;
        Ok(())
    }

    async fn get_gauge(&self, name: &str) -> StorageResult<f64> {
        self.inner.get_gauge(name).await
    }

    async fn get_counter(&self, name: &str) -> StorageResult<i64> {
        self.inner.get_counter(name).await
    }

    async fn list_gauge_names(&self) -> StorageResult<Vec<String>> {
        self.inner.list_gauge_names().await
    }

    async fn list_counter_names(&self) -> StorageResult<Vec<String>> {
        self.inner.list_counter_names().await
    }

    async fn ping(&self) -> StorageResult<()> {
        self.inner.ping().await
    }

    async fn update_batch(&self, metrics: &[Metric]) -> StorageResult<()> {
        self.inner.update_batch(metrics).await?;
        self.after_write().await;
        Ok(())
    }
}

/// Serialize the full state of `repo` into `path`
///
/// All values are read before the file is touched, so a failed read or a
/// non-finite gauge leaves the previous snapshot in place.
#[instrument(skip_all)]
pub async fn save_snapshot<R: Repository + ?Sized>(repo: &R, path: &Path) -> StorageResult<()> {
    let mut gauges = repo.list_gauge_names().await?;
    let mut counters = repo.list_counter_names().await?;
    gauges.sort();
    counters.sort();

    let mut records = Vec::with_capacity(gauges.len() + counters.len());
    for name in gauges {
        let value = repo.get_gauge(&name).await?;
        // JSON has no representation for NaN or infinities
        if !value.is_finite() {
            return Err(StorageError::SerializationError(format!(
                "gauge {name} has non-finite value {value}"
            )));
        }
        records.push(MetricRecord::from(&Metric::Gauge { name, value }));
    }
    for name in counters {
        let delta = repo.get_counter(&name).await?;
        records.push(MetricRecord::from(&Metric::Counter { name, delta }));
    }

    let mut buf = Vec::new();
    {
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
        records.serialize(&mut serializer)?;
    }

    tokio::fs::write(path, &buf).await?;
    trace!(
        "wrote snapshot with {} metrics to {}",
        records.len(),
        path.display()
    );
    Ok(())
}

async fn run_periodic_save<R: Repository + ?Sized>(
    repo: Arc<R>,
    path: PathBuf,
    interval: Duration,
    on_error: Option<SaveErrorHook>,
) {
    let mut ticker = tokio::time::interval(interval);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        trace!("periodic snapshot save");
        if let Err(err) = save_snapshot(repo.as_ref(), &path).await {
            report_save_error(&on_error, &err);
        }
    }
}

fn report_save_error(hook: &Option<SaveErrorHook>, err: &StorageError) {
    error!("failed to save snapshot: {}", err);
    if let Some(hook) = hook {
        hook(err);
    }
}
