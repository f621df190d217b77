//! Retry decorator
//!
//! [`Retrying`] re-invokes failed operations of an inner [`Repository`] when
//! the failure is classified as retriable.
//!
//! ## Policy
//!
//! - At most `max_attempts` invocations of the same call (3 by default)
//! - Linear backoff: the first wait is `initial_wait`, each following wait is
//!   `wait_step` longer (1s, 3s, 5s, ... by default). No jitter, no cap and no
//!   overall deadline.
//! - Non-retriable errors are returned immediately. After the last attempt the
//!   final error is wrapped in [`StorageError::RetriesExhausted`].
//!
//! Retries of one call are strictly sequential. The wait suspends the calling
//! task only.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, instrument, warn};

use super::backend::Repository;
use super::classify::{ErrorClass, classify};
use super::error::{StorageError, StorageResult};
use super::schema::Metric;

/// Attempt budget and backoff progression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_wait: Duration,
    pub wait_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_wait: Duration::from_secs(1),
            wait_step: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Wait before the attempt following failed attempt number `attempt`
    /// (1-based)
    pub fn wait_after(&self, attempt: u32) -> Duration {
        self.initial_wait + self.wait_step * attempt.saturating_sub(1)
    }
}

/// Repository that retries retriable failures of an inner repository
#[derive(Debug)]
pub struct Retrying<R> {
    inner: R,
    policy: RetryPolicy,
}

impl<R: Repository> Retrying<R> {
    /// Wrap `inner` with the default policy
    pub fn new(inner: R) -> Self {
        Self::with_policy(inner, RetryPolicy::default())
    }

    pub fn with_policy(inner: R, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Invoke `op` until it succeeds, fails permanently or runs out of
    /// attempts
    ///
    /// Every `Repository` method goes through here.
    #[instrument(skip(self, op))]
    async fn retrying<'a, T, F>(&self, operation: &'static str, op: F) -> StorageResult<T>
    where
        F: Fn() -> BoxFuture<'a, StorageResult<T>> + Send + Sync,
        T: Send,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if classify(&err) == ErrorClass::NonRetriable {
                debug!("{operation} failed with non-retriable error: {err}");
                return Err(err);
            }

            if attempt >= max_attempts {
                warn!("{operation} failed after {attempt} attempts: {err}");
                return Err(StorageError::RetriesExhausted {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            let wait = self.policy.wait_after(attempt);
            warn!(
                "{operation} attempt {attempt}/{max_attempts} failed, retrying in {:?}: {err}",
                wait
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl<R: Repository> Repository for Retrying<R> {
    async fn update_gauge(&self, name: &str, value: f64) -> StorageResult<()> {
        self.retrying("update_gauge", || self.inner.update_gauge(name, value))
            .await
    }

    async fn update_counter(&self, name: &str, delta: i64) -> StorageResult<()> {
        self.retrying("update_counter", || self.inner.update_counter(name, delta))
            .await
    }

    async fn get_gauge(&self, name: &str) -> StorageResult<f64> {
        self.retrying("get_gauge", || self.inner.get_gauge(name))
            .await
    }

    async fn get_counter(&self, name: &str) -> StorageResult<i64> {
        self.retrying("get_counter", || self.inner.get_counter(name))
            .await
    }

    async fn list_gauge_names(&self) -> StorageResult<Vec<String>> {
        self.retrying("list_gauge_names", || self.inner.list_gauge_names())
            .await
    }

    async fn list_counter_names(&self) -> StorageResult<Vec<String>> {
        self.retrying("list_counter_names", || self.inner.list_counter_names())
            .await
    }

    async fn ping(&self) -> StorageResult<()> {
        self.retrying("ping", || self.inner.ping()).await
    }

    async fn update_batch(&self, metrics: &[Metric]) -> StorageResult<()> {
        self.retrying("update_batch", || self.inner.update_batch(metrics))
            .await
    }
}
