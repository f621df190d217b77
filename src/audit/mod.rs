//! Audit trail of successful metric writes
//!
//! The audit subsystem is independent of the storage chain. After a write
//! through a [`Repository`](crate::storage::Repository) succeeds, the caller
//! builds an [`AuditEvent`] and hands it to an [`AuditDispatcher`], which
//! delivers it to one or more observers on a background task.
//!
//! ## Message Flow
//!
//! ```text
//! caller ── notify() ──► bounded queue ──► worker ──► AuditObserver
//!              │                                        ├─ FileObserver (JSON lines)
//!              └─ QueueFull / Closed                    └─ HttpObserver (POST)
//! ```
//!
//! `notify` never blocks: a full queue is reported to the caller as
//! [`AuditError::QueueFull`]. Observer failures are logged by the worker and
//! never reach the producer.

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod file;
pub mod http;

use async_trait::async_trait;
use tracing::warn;

pub use dispatcher::AuditDispatcher;
pub use error::{AuditError, AuditResult};
pub use event::AuditEvent;
pub use file::FileObserver;
pub use http::HttpObserver;

/// Receiver of audit events
#[async_trait]
pub trait AuditObserver: Send + Sync {
    async fn handle(&self, event: &AuditEvent) -> AuditResult<()>;
}

/// Observer delivering every event to several observers
///
/// Every observer sees every event, even if an earlier one failed. The first
/// failure is returned.
pub struct Fanout {
    observers: Vec<Box<dyn AuditObserver>>,
}

impl Fanout {
    pub fn new(observers: Vec<Box<dyn AuditObserver>>) -> Self {
        Self { observers }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[async_trait]
impl AuditObserver for Fanout {
    async fn handle(&self, event: &AuditEvent) -> AuditResult<()> {
        let mut first_error = None;

        for observer in &self.observers {
            if let Err(err) = observer.handle(event).await {
                warn!("audit observer failed: {}", err);
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
