//! Mutual-exclusion decorator
//!
//! [`Locked`] turns any [`MetricStore`] into a shared [`Repository`] by
//! running every operation inside one global critical section. It does not
//! distinguish gauges from counters or one key from another: at most one
//! operation runs at any time, in a total order.
//!
//! The lock is a `parking_lot` mutex, so the guard is released on every exit
//! path including a panic unwind, and a panicking operation does not poison
//! the store for later callers.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::trace;

use super::backend::{MetricStore, Repository};
use super::error::StorageResult;

/// Repository that serializes all access to an inner store
#[derive(Debug, Default)]
pub struct Locked<S> {
    inner: Mutex<S>,
}

impl<S: MetricStore> Locked<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Run `op` with exclusive access to the inner store
    ///
    /// Every `Repository` method goes through here. The result of `op` is
    /// returned unchanged.
    pub fn with_lock<T>(&self, op: impl FnOnce(&mut S) -> T) -> T {
        let mut guard = self.inner.lock();
        op(&mut guard)
    }

    /// Unwrap the inner store
    pub fn into_inner(self) -> S {
        self.inner.into_inner()
    }
}

#[async_trait]
impl<S: MetricStore> Repository for Locked<S> {
    async fn update_gauge(&self, name: &str, value: f64) -> StorageResult<()> {
        trace!("locked gauge update: {name}");
        self.with_lock(|store| store.update_gauge(name, value))
    }

    async fn update_counter(&self, name: &str, delta: i64) -> StorageResult<()> {
        trace!("locked counter update: {name}");
        self.with_lock(|store| store.update_counter(name, delta))
    }

    async fn get_gauge(&self, name: &str) -> StorageResult<f64> {
        self.with_lock(|store| store.get_gauge(name))
    }

    async fn get_counter(&self, name: &str) -> StorageResult<i64> {
        self.with_lock(|store| store.get_counter(name))
    }

    async fn list_gauge_names(&self) -> StorageResult<Vec<String>> {
        Ok(self.with_lock(|store| store.gauge_names()))
    }

    async fn list_counter_names(&self) -> StorageResult<Vec<String>> {
        Ok(self.with_lock(|store| store.counter_names()))
    }
}
