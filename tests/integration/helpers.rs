//! Helper types for integration tests

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use metrics_keeper::storage::{
    ConcurrentMemStorage, Repository, RetryPolicy, StorageError, StorageResult,
};
use std::time::Duration;

/// Retry policy with millisecond waits
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_wait: Duration::from_millis(1),
        wait_step: Duration::from_millis(1),
    }
}

/// In-memory repository whose first `failures` calls fail with a database
/// error carrying `code`
pub struct FlakyRepository {
    inner: ConcurrentMemStorage,
    calls: AtomicU32,
    failures: u32,
    code: &'static str,
}

impl FlakyRepository {
    pub fn new(failures: u32, code: &'static str) -> Self {
        Self {
            inner: ConcurrentMemStorage::new(),
            calls: AtomicU32::new(0),
            failures,
            code,
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> StorageResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(StorageError::Database {
                code: Some(self.code.to_string()),
                message: format!("injected failure #{call}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for FlakyRepository {
    async fn update_gauge(&self, name: &str, value: f64) -> StorageResult<()> {
        self.check()?;
        self.inner.update_gauge(name, value).await
    }

    async fn update_counter(&self, name: &str, delta: i64) -> StorageResult<()> {
        self.check()?;
        self.inner.update_counter(name, delta).await
    }

    async fn get_gauge(&self, name: &str) -> StorageResult<f64> {
        self.check()?;
        self.inner.get_gauge(name).await
    }

    async fn get_counter(&self, name: &str) -> StorageResult<i64> {
        self.check()?;
        self.inner.get_counter(name).await
    }

    async fn list_gauge_names(&self) -> StorageResult<Vec<String>> {
        self.check()?;
        self.inner.list_gauge_names().await
    }

    async fn list_counter_names(&self) -> StorageResult<Vec<String>> {
        self.check()?;
        self.inner.list_counter_names().await
    }
}
