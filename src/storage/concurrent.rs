//! Concurrent in-memory storage backend
//!
//! Gauges and counters live in two independent [`DashMap`]s, each sharded
//! internally, so readers and writers never contend on a store-wide lock.
//! Updates of a single key are atomic. Name listings iterate the shards one by
//! one and may miss or include keys written concurrently; point reads are
//! always consistent.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use super::backend::Repository;
use super::error::{StorageError, StorageResult};
use super::schema::MetricKind;

/// Thread-safe in-memory backend
#[derive(Debug, Default)]
pub struct ConcurrentMemStorage {
    gauges: DashMap<String, f64>,
    counters: DashMap<String, i64>,
}

impl ConcurrentMemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for ConcurrentMemStorage {
    async fn update_gauge(&self, name: &str, value: f64) -> StorageResult<()> {
        trace!("gauge {name} = {value}");
        self.gauges.insert(name.to_string(), value);
        Ok(())
    }

    async fn update_counter(&self, name: &str, delta: i64) -> StorageResult<()> {
        trace!("counter {name} += {delta}");
        // the entry guard holds the shard lock, so read-add-write is atomic
        let mut total = self.counters.entry(name.to_string()).or_insert(0);
        *total = total.wrapping_add(delta);
        Ok(())
    }

    async fn get_gauge(&self, name: &str) -> StorageResult<f64> {
        self.gauges
            .get(name)
            .map(|value| *value)
            .ok_or_else(|| StorageError::NotFound {
                kind: MetricKind::Gauge,
                name: name.to_string(),
            })
    }

    async fn get_counter(&self, name: &str) -> StorageResult<i64> {
        self.counters
            .get(name)
            .map(|total| *total)
            .ok_or_else(|| StorageError::NotFound {
                kind: MetricKind::Counter,
                name: name.to_string(),
            })
    }

    async fn list_gauge_names(&self) -> StorageResult<Vec<String>> {
        Ok(self.gauges.iter().map(|entry| entry.key().clone()).collect())
    }

    async fn list_counter_names(&self) -> StorageResult<Vec<String>> {
        Ok(self
            .counters
            .iter()
            .map(|entry| entry.key().clone())
            .collect())
    }
}
