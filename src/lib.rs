//! Metric storage with pluggable backends, resilience decorators and an
//! asynchronous audit trail.

pub mod audit;
pub mod config;
pub mod storage;

pub use storage::{Metric, MetricKind, Repository, StorageError, StorageResult};
