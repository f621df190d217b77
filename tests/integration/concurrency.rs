//! Concurrency tests
//!
//! These tests verify that concurrent writers never lose updates:
//! - Counter totals through the mutex decorator
//! - Counter totals on the concurrent backend
//! - Concurrent writers through a whole decorator chain

use std::sync::Arc;
use std::time::Duration;

use metrics_keeper::storage::{
    ConcurrentMemStorage, Locked, MemStorage, Repository, Retrying, SnapshotStorage,
};

const TASKS: i64 = 16;
const INCREMENTS: i64 = 200;

async fn hammer_counter(repo: Arc<dyn Repository>) {
    let mut handles = vec![];
    for _ in 0..TASKS {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..INCREMENTS {
                repo.update_counter("requests", 1).await.unwrap();
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_locked_memory_counts_every_increment() {
    let repo: Arc<dyn Repository> = Arc::new(Locked::new(MemStorage::new()));

    hammer_counter(repo.clone()).await;

    assert_eq!(repo.get_counter("requests").await.unwrap(), TASKS * INCREMENTS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_backend_counts_every_increment() {
    let repo: Arc<dyn Repository> = Arc::new(ConcurrentMemStorage::new());

    hammer_counter(repo.clone()).await;

    assert_eq!(repo.get_counter("requests").await.unwrap(), TASKS * INCREMENTS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_chain_under_concurrent_writers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    let backend = Arc::new(Retrying::new(Locked::new(MemStorage::new())));
    let repo: Arc<dyn Repository> = Arc::new(SnapshotStorage::new(
        backend,
        &path,
        Duration::from_secs(3600),
    ));

    let mut handles = vec![];
    for task in 0..TASKS {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..INCREMENTS {
                repo.update_counter("requests", 1).await.unwrap();
                repo.update_gauge(&format!("gauge{task}"), i as f64)
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(repo.get_counter("requests").await.unwrap(), TASKS * INCREMENTS);
    assert_eq!(
        repo.list_gauge_names().await.unwrap().len(),
        TASKS as usize
    );
    for task in 0..TASKS {
        assert_eq!(
            repo.get_gauge(&format!("gauge{task}")).await.unwrap(),
            (INCREMENTS - 1) as f64
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_see_monotonic_counter() {
    let repo = Arc::new(ConcurrentMemStorage::new());
    repo.update_counter("hits", 0).await.unwrap();

    let writer = {
        let repo = repo.clone();
        tokio::spawn(async move {
            for _ in 0..1000 {
                repo.update_counter("hits", 1).await.unwrap();
            }
        })
    };

    let mut last = 0;
    while !writer.is_finished() {
        let current = repo.get_counter("hits").await.unwrap();
        assert!(current >= last, "counter went from {last} to {current}");
        last = current;
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();

    assert_eq!(repo.get_counter("hits").await.unwrap(), 1000);
}
