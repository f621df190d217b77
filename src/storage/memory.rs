//! In-memory storage backend (no persistence, no locking)
//!
//! This backend keeps gauges and counters in two plain hash maps.
//! It's useful for:
//! - Testing without database dependencies
//! - Single-threaded tools
//! - Shared use behind [`Locked`](super::locked::Locked), optionally
//!   persisted by [`SnapshotStorage`](super::snapshot::SnapshotStorage)
//!
//! ## Limitations
//!
//! - **No persistence**: All data lost on restart
//! - **No synchronization**: Mutations need `&mut self`

use std::collections::HashMap;

use super::backend::MetricStore;
use super::error::{StorageError, StorageResult};
use super::schema::MetricKind;

/// In-memory storage backend
#[derive(Debug, Default, Clone)]
pub struct MemStorage {
    gauges: HashMap<String, f64>,
    counters: HashMap<String, i64>,
}

impl MemStorage {
    /// Create a new, empty in-memory backend
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricStore for MemStorage {
    fn update_gauge(&mut self, name: &str, value: f64) -> StorageResult<()> {
        self.gauges.insert(name.to_string(), value);
        Ok(())
    }

    fn update_counter(&mut self, name: &str, delta: i64) -> StorageResult<()> {
        let total = self.counters.entry(name.to_string()).or_insert(0);
        *total = total.wrapping_add(delta);
        Ok(())
    }

    fn get_gauge(&self, name: &str) -> StorageResult<f64> {
        self.gauges
            .get(name)
            .copied()
            .ok_or_else(|| StorageError::NotFound {
                kind: MetricKind::Gauge,
                name: name.to_string(),
            })
    }

    fn get_counter(&self, name: &str) -> StorageResult<i64> {
        self.counters
            .get(name)
            .copied()
            .ok_or_else(|| StorageError::NotFound {
                kind: MetricKind::Counter,
                name: name.to_string(),
            })
    }

    fn gauge_names(&self) -> Vec<String> {
        self.gauges.keys().cloned().collect()
    }

    fn counter_names(&self) -> Vec<String> {
        self.counters.keys().cloned().collect()
    }
}
