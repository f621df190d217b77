//! Storage backends and decorators for gauge and counter metrics
//!
//! This module provides a trait-based abstraction for storing metrics in
//! memory, in a SQLite database or in memory mirrored to a snapshot file.
//!
//! ## Design
//!
//! - **Trait-based**: every backend and decorator implements [`Repository`],
//!   so chains are built by wrapping one repository in another
//! - **Async**: all operations are async for use from Tokio tasks
//! - **Classified failures**: database errors carry their code so the retry
//!   decorator can tell transient failures from permanent ones
//!
//! ## Building blocks
//!
//! - [`MemStorage`]: plain maps, needs `&mut self`, shared via [`Locked`]
//! - [`ConcurrentMemStorage`]: sharded concurrent maps
//! - [`SqliteStorage`] (feature `storage-sqlite`): pooled SQLite database
//! - [`Locked`]: one global critical section around a [`MetricStore`]
//! - [`Retrying`]: retries retriable failures with linear backoff
//! - [`SnapshotStorage`]: mirrors a repository into a JSON snapshot file
//!
//! ## Usage
//!
//! ```no_run
//! use metrics_keeper::storage::{Repository, Retrying, sqlite::SqliteStorage};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let repo = Retrying::new(SqliteStorage::new("./metrics.db").await?);
//!     repo.update_counter("requests", 1).await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod classify;
pub mod concurrent;
pub mod error;
pub mod locked;
pub mod memory;
pub mod retry;
pub mod schema;
pub mod snapshot;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{MetricStore, Repository};
pub use classify::{ErrorClass, classify};
pub use concurrent::ConcurrentMemStorage;
pub use error::{StorageError, StorageResult};
pub use locked::Locked;
pub use memory::MemStorage;
pub use retry::{RetryPolicy, Retrying};
pub use schema::{Metric, MetricKind, MetricRecord};
pub use snapshot::SnapshotStorage;
#[cfg(feature = "storage-sqlite")]
pub use sqlite::SqliteStorage;
