//! Audit pipeline tests
//!
//! These tests verify delivery from the dispatcher to the observers:
//! - File and HTTP observers receive every event through a fan-out
//! - A failing observer does not stop delivery to the others
//! - Events written after a successful store call are delivered on close

use std::sync::Arc;

use metrics_keeper::audit::{
    AuditDispatcher, AuditEvent, AuditObserver, Fanout, FileObserver, HttpObserver,
};
use metrics_keeper::storage::{ConcurrentMemStorage, Repository};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fanout_to_file_and_http() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audit"))
        .respond_with(ResponseTemplate::new(204))
        .expect(3)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("audit.log");

    let observers: Vec<Box<dyn AuditObserver>> = vec![
        Box::new(FileObserver::new(&log)),
        Box::new(HttpObserver::new(format!("{}/audit", mock_server.uri())).unwrap()),
    ];
    let dispatcher = AuditDispatcher::spawn(10, Arc::new(Fanout::new(observers)));

    for n in 0..3 {
        dispatcher
            .notify(AuditEvent::new(n, vec![format!("m{n}")], "192.168.1.10"))
            .unwrap();
    }
    dispatcher.close().await;

    let lines: Vec<AuditEvent> = std::fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2].metrics, vec!["m2".to_string()]);
}

#[tokio::test]
async fn test_unreachable_webhook_does_not_block_file_log() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("audit.log");

    // http first so its failure precedes the file write
    let observers: Vec<Box<dyn AuditObserver>> = vec![
        Box::new(HttpObserver::new("http://127.0.0.1:9/audit").unwrap()),
        Box::new(FileObserver::new(&log)),
    ];
    let dispatcher = AuditDispatcher::spawn(4, Arc::new(Fanout::new(observers)));

    dispatcher
        .notify(AuditEvent::new(1, vec!["alloc".to_string()], "10.0.0.1"))
        .unwrap();
    dispatcher
        .notify(AuditEvent::new(2, vec!["alloc".to_string()], "10.0.0.1"))
        .unwrap();
    dispatcher.close().await;

    assert_eq!(std::fs::read_to_string(&log).unwrap().lines().count(), 2);
}

#[tokio::test]
async fn test_store_then_audit() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("audit.log");

    let repo = ConcurrentMemStorage::new();
    let dispatcher = AuditDispatcher::spawn(100, Arc::new(FileObserver::new(&log)));

    let names = vec!["alloc".to_string(), "requests".to_string()];
    repo.update_gauge("alloc", 8.0).await.unwrap();
    repo.update_counter("requests", 1).await.unwrap();
    dispatcher
        .notify(AuditEvent::now(names.clone(), "172.16.0.3"))
        .unwrap();
    dispatcher.close().await;

    let line = std::fs::read_to_string(&log).unwrap();
    let event: AuditEvent = serde_json::from_str(line.trim_end()).unwrap();
    assert_eq!(event.metrics, names);
    assert_eq!(event.ip_address, "172.16.0.3");
    assert!(event.ts > 0);
}
