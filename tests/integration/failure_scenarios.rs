//! Failure tests for the resilience decorators
//!
//! These tests verify that failures are handled as classified:
//! - Transient database failures are retried and absorbed
//! - Permanent failures surface immediately
//! - Lookup errors pass through every decorator unchanged

use std::sync::Arc;
use std::time::Duration;

use metrics_keeper::storage::{
    Locked, MemStorage, MetricKind, Repository, Retrying, SnapshotStorage, StorageError,
};

use crate::helpers::*;

#[tokio::test]
async fn test_transient_failures_are_absorbed() {
    let repo = Retrying::with_policy(FlakyRepository::new(2, "40P01"), fast_retry_policy());

    repo.update_counter("requests", 3).await.unwrap();

    assert_eq!(repo.inner().calls(), 3);
    assert_eq!(repo.get_counter("requests").await.unwrap(), 3);
}

#[tokio::test]
async fn test_sqlite_busy_is_retried() {
    let repo = Retrying::with_policy(FlakyRepository::new(1, "5"), fast_retry_policy());

    repo.update_gauge("alloc", 1.0).await.unwrap();

    assert_eq!(repo.inner().calls(), 2);
}

#[tokio::test]
async fn test_constraint_violation_fails_fast() {
    let repo = Retrying::with_policy(FlakyRepository::new(5, "23505"), fast_retry_policy());

    let err = repo.update_gauge("alloc", 1.0).await.unwrap_err();

    assert_eq!(repo.inner().calls(), 1);
    assert!(!err.is_retriable());
}

#[tokio::test]
async fn test_persistent_outage_exhausts_attempts() {
    let repo = Retrying::with_policy(FlakyRepository::new(u32::MAX, "08006"), fast_retry_policy());

    let err = repo.list_counter_names().await.unwrap_err();

    assert_eq!(repo.inner().calls(), 3);
    match err {
        StorageError::RetriesExhausted { attempts, source } => {
            assert_eq!(attempts, 3);
            assert!(source.is_retriable());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_not_found_passes_through_the_chain() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(Retrying::new(Locked::new(MemStorage::new())));
    let repo = SnapshotStorage::new(backend, dir.path().join("s.json"), Duration::ZERO);

    let err = repo.get_gauge("missing").await.unwrap_err();

    match err {
        StorageError::NotFound { kind, name } => {
            assert_eq!(kind, MetricKind::Gauge);
            assert_eq!(name, "missing");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_failed_write_does_not_touch_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    let repo = SnapshotStorage::new(
        Arc::new(FlakyRepository::new(1, "23505")),
        &path,
        Duration::ZERO,
    );

    assert!(repo.update_counter("requests", 1).await.is_err());
    assert!(!path.exists());

    repo.update_counter("requests", 1).await.unwrap();
    assert!(path.exists());
}

#[cfg(feature = "storage-sqlite")]
mod sqlite {
    use metrics_keeper::storage::{Metric, Repository, Retrying, SqliteStorage, StorageError};

    #[tokio::test]
    async fn test_retrying_sqlite_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Retrying::new(
            SqliteStorage::new(dir.path().join("metrics.db"))
                .await
                .unwrap(),
        );

        repo.ping().await.unwrap();
        repo.update_batch(&[
            Metric::gauge("alloc", 12.5),
            Metric::counter("requests", 2),
            Metric::counter("requests", 3),
        ])
        .await
        .unwrap();

        assert_eq!(repo.get_gauge("alloc").await.unwrap(), 12.5);
        assert_eq!(repo.get_counter("requests").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Retrying::new(
            SqliteStorage::new(dir.path().join("metrics.db"))
                .await
                .unwrap(),
        );
        repo.update_gauge("alloc", 1.0).await.unwrap();

        let started = std::time::Instant::now();
        let err = repo.get_counter("alloc").await.unwrap_err();

        assert!(matches!(err, StorageError::TypeMismatch { .. }), "{err}");
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.db");

        {
            let repo = SqliteStorage::new(&path).await.unwrap();
            repo.update_counter("requests", 7).await.unwrap();
            repo.close().await;
        }

        let repo = SqliteStorage::new(&path).await.unwrap();
        assert_eq!(repo.get_counter("requests").await.unwrap(), 7);
    }
}
