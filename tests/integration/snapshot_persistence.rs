//! Snapshot persistence tests
//!
//! These tests verify the snapshot file across process restarts:
//! - A fresh repository restored from a snapshot has the same state
//! - Periodic saves pick up writes made between ticks
//! - Corrupt snapshots leave the repository untouched

use std::sync::Arc;
use std::time::Duration;

use metrics_keeper::storage::{
    ConcurrentMemStorage, Locked, MemStorage, Repository, SnapshotStorage, StorageError,
    snapshot::save_snapshot,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    {
        let repo = SnapshotStorage::new(
            Arc::new(Locked::new(MemStorage::new())),
            &path,
            Duration::ZERO,
        );
        repo.update_gauge("alloc", 1024.5).await.unwrap();
        repo.update_gauge("heap", -3.0).await.unwrap();
        repo.update_counter("requests", 40).await.unwrap();
        repo.update_counter("requests", 2).await.unwrap();
    }

    let restarted = SnapshotStorage::new(
        Arc::new(ConcurrentMemStorage::new()),
        &path,
        Duration::ZERO,
    );
    assert_eq!(restarted.restore().await.unwrap(), 3);

    assert_eq!(restarted.get_gauge("alloc").await.unwrap(), 1024.5);
    assert_eq!(restarted.get_gauge("heap").await.unwrap(), -3.0);
    assert_eq!(restarted.get_counter("requests").await.unwrap(), 42);

    let mut gauges = restarted.list_gauge_names().await.unwrap();
    gauges.sort();
    assert_eq!(gauges, vec!["alloc".to_string(), "heap".to_string()]);
}

#[tokio::test]
async fn test_periodic_save_picks_up_later_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    let repo = SnapshotStorage::new(
        Arc::new(ConcurrentMemStorage::new()),
        &path,
        Duration::from_millis(20),
    );
    repo.update_counter("ticks", 5).await.unwrap();

    let mut saved = String::new();
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        saved = std::fs::read_to_string(&path).unwrap_or_default();
        if saved.contains("\"ticks\"") {
            break;
        }
    }
    assert!(saved.contains("\"delta\": 5"), "{saved}");
}

#[tokio::test]
async fn test_corrupt_snapshot_leaves_repository_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    std::fs::write(
        &path,
        r#"[
            {"id": "alloc", "type": "gauge", "value": 1.0},
            {"id": "requests", "type": "counter"}
        ]"#,
    )
    .unwrap();

    let inner = Arc::new(ConcurrentMemStorage::new());
    let repo = SnapshotStorage::new(inner.clone(), &path, Duration::ZERO);

    let err = repo.restore().await.unwrap_err();

    assert!(matches!(err, StorageError::MissingValue { .. }), "{err}");
    assert!(inner.list_gauge_names().await.unwrap().is_empty());
    assert!(inner.list_counter_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_explicit_save_of_a_plain_repository() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    let repo = ConcurrentMemStorage::new();
    repo.update_counter("b", 2).await.unwrap();
    repo.update_counter("a", 1).await.unwrap();
    repo.update_gauge("z", 0.5).await.unwrap();

    save_snapshot(&repo, &path).await.unwrap();

    let records: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        records,
        vec![
            serde_json::json!({"id": "z", "type": "gauge", "value": 0.5}),
            serde_json::json!({"id": "a", "type": "counter", "delta": 1}),
            serde_json::json!({"id": "b", "type": "counter", "delta": 2}),
        ]
    );
}
