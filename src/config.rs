use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::audit::{AuditDispatcher, AuditObserver, Fanout, FileObserver, HttpObserver};
use crate::storage::{
    ConcurrentMemStorage, Locked, MemStorage, Repository, RetryPolicy, SnapshotStorage,
};

/// Storage backend configuration
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Plain in-memory maps behind a global lock
    #[default]
    Memory,

    /// Sharded concurrent in-memory maps
    Concurrent,

    /// SQLite database
    Sqlite {
        /// Path to the SQLite database file
        #[serde(default = "default_sqlite_path")]
        path: PathBuf,
    },
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./metrics.db")
}

/// Snapshot persistence for the in-memory backends
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct SnapshotConfig {
    pub path: PathBuf,

    /// Seconds between periodic saves, 0 saves after every write
    #[serde(default = "default_snapshot_interval")]
    pub interval_secs: u64,

    /// Load the snapshot file on start
    #[serde(default = "default_true")]
    pub restore: bool,
}

fn default_snapshot_interval() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

/// Retry settings applied around the SQLite backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_wait_ms: u64,
    pub wait_step_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig::from(RetryPolicy::default())
    }
}

impl From<RetryPolicy> for RetryConfig {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts,
            initial_wait_ms: policy.initial_wait.as_millis() as u64,
            wait_step_ms: policy.wait_step.as_millis() as u64,
        }
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_wait: Duration::from_millis(config.initial_wait_ms),
            wait_step: Duration::from_millis(config.wait_step_ms),
        }
    }
}

/// Audit trail configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Append events as JSON lines to this file
    pub file: Option<PathBuf>,

    /// POST events to this URL
    pub url: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            queue_size: default_queue_size(),
            file: None,
            url: None,
        }
    }
}

fn default_queue_size() -> usize {
    100
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct Config {
    /// Storage configuration (optional - defaults to in-memory)
    pub storage: Option<StorageConfig>,

    pub snapshot: Option<SnapshotConfig>,

    pub retry: Option<RetryConfig>,

    pub audit: Option<AuditConfig>,
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

/// Compose the repository chain described by `config`
///
/// Must be called within a Tokio runtime when periodic snapshots are
/// configured.
pub async fn build_repository(config: &Config) -> anyhow::Result<Arc<dyn Repository>> {
    let storage = config.storage.clone().unwrap_or_default();
    debug!("building storage backend: {storage:?}");

    let repo: Arc<dyn Repository> = match storage {
        StorageConfig::Memory => {
            with_snapshot(Arc::new(Locked::new(MemStorage::new())), config).await?
        }
        StorageConfig::Concurrent => {
            with_snapshot(Arc::new(ConcurrentMemStorage::new()), config).await?
        }
        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => {
            use crate::storage::{Retrying, SqliteStorage};

            if config.snapshot.is_some() {
                debug!("snapshots are ignored for the sqlite backend");
            }
            let policy = RetryPolicy::from(config.retry.unwrap_or_default());
            let sqlite = SqliteStorage::new(&path).await?;
            Arc::new(Retrying::with_policy(sqlite, policy))
        }
        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => {
            anyhow::bail!("sqlite backend requested but the storage-sqlite feature is disabled")
        }
    };

    Ok(repo)
}

async fn with_snapshot<R: Repository + 'static>(
    inner: Arc<R>,
    config: &Config,
) -> anyhow::Result<Arc<dyn Repository>> {
    let Some(snapshot) = &config.snapshot else {
        return Ok(inner);
    };

    let storage = SnapshotStorage::new(
        inner,
        snapshot.path.clone(),
        Duration::from_secs(snapshot.interval_secs),
    );
    if snapshot.restore {
        storage.restore().await?;
    }

    Ok(Arc::new(storage))
}

/// Build the audit dispatcher, `None` when no observer is configured
pub fn build_audit(config: &AuditConfig) -> anyhow::Result<Option<AuditDispatcher>> {
    let mut observers: Vec<Box<dyn AuditObserver>> = vec![];

    if let Some(file) = &config.file {
        debug!("auditing to file {}", file.display());
        observers.push(Box::new(FileObserver::new(file)));
    }
    if let Some(url) = &config.url {
        debug!("auditing to {url}");
        observers.push(Box::new(HttpObserver::new(url)?));
    }

    if observers.is_empty() {
        return Ok(None);
    }

    let observer: Arc<dyn AuditObserver> = Arc::new(Fanout::new(observers));
    Ok(Some(AuditDispatcher::spawn(config.queue_size, observer)))
}
