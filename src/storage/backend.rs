//! Storage contracts
//!
//! This module defines the two traits every storage implementation is built
//! around:
//!
//! - [`Repository`]: the shared, async façade consumed by callers. Backends
//!   and decorators alike implement it, so decorators compose by holding an
//!   inner `Repository`.
//! - [`MetricStore`]: a synchronous store whose mutations need `&mut self`.
//!   Such a store is not safe for concurrent use on its own and is turned into
//!   a `Repository` by [`Locked`](super::locked::Locked).

use std::sync::Arc;

use async_trait::async_trait;

use super::error::StorageResult;
use super::schema::Metric;

/// Uniform storage façade for gauges and counters
///
/// ## Contract
///
/// - `update_gauge` replaces any existing value, `update_counter` adds to the
///   accumulated total (zero if absent). Neither rejects a value; only I/O
///   failures surface as errors.
/// - `get_gauge`/`get_counter` fail with
///   [`StorageError::NotFound`](super::StorageError::NotFound) for unknown
///   names, never with a zero value.
/// - Name listings are a snapshot taken at call time, in no particular order.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` as they are shared across tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Set a gauge to `value`
    async fn update_gauge(&self, name: &str, value: f64) -> StorageResult<()>;

    /// Add `delta` to a counter
    async fn update_counter(&self, name: &str, delta: i64) -> StorageResult<()>;

    /// Read the last value written to a gauge
    async fn get_gauge(&self, name: &str) -> StorageResult<f64>;

    /// Read the accumulated total of a counter
    async fn get_counter(&self, name: &str) -> StorageResult<i64>;

    /// Names of all gauges
    async fn list_gauge_names(&self) -> StorageResult<Vec<String>>;

    /// Names of all counters
    async fn list_counter_names(&self) -> StorageResult<Vec<String>>;

    /// Check that the backend is reachable
    ///
    /// In-memory stores are always alive, so the default succeeds.
    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Apply a batch of updates in order
    ///
    /// The default replays the batch one metric at a time. Backends with
    /// transactions override this to apply the batch atomically.
    async fn update_batch(&self, metrics: &[Metric]) -> StorageResult<()> {
        for metric in metrics {
            match metric {
                Metric::Gauge { name, value } => self.update_gauge(name, *value).await?,
                Metric::Counter { name, delta } => self.update_counter(name, *delta).await?,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<R: Repository + ?Sized> Repository for Arc<R> {
    async fn update_gauge(&self, name: &str, value: f64) -> StorageResult<()> {
        (**self).update_gauge(name, value).await
    }

    async fn update_counter(&self, name: &str, delta: i64) -> StorageResult<()> {
        (**self).update_counter(name, delta).await
    }

    async fn get_gauge(&self, name: &str) -> StorageResult<f64> {
        (**self).get_gauge(name).await
    }

    async fn get_counter(&self, name: &str) -> StorageResult<i64> {
        (**self).get_counter(name).await
    }

    async fn list_gauge_names(&self) -> StorageResult<Vec<String>> {
        (**self).list_gauge_names().await
    }

    async fn list_counter_names(&self) -> StorageResult<Vec<String>> {
        (**self).list_counter_names().await
    }

    async fn ping(&self) -> StorageResult<()> {
        (**self).ping().await
    }

    async fn update_batch(&self, metrics: &[Metric]) -> StorageResult<()> {
        (**self).update_batch(metrics).await
    }
}

/// Synchronous metric store without internal synchronization
///
/// Mutations take `&mut self`, so the borrow checker enforces that a store is
/// either used by a single owner or wrapped in
/// [`Locked`](super::locked::Locked).
pub trait MetricStore: Send {
    fn update_gauge(&mut self, name: &str, value: f64) -> StorageResult<()>;

    fn update_counter(&mut self, name: &str, delta: i64) -> StorageResult<()>;

    fn get_gauge(&self, name: &str) -> StorageResult<f64>;

    fn get_counter(&self, name: &str) -> StorageResult<i64>;

    fn gauge_names(&self) -> Vec<String>;

    fn counter_names(&self) -> Vec<String>;
}
