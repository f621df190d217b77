//! AuditDispatcher - delivers audit events on a background task
//!
//! ## Architecture
//!
//! The dispatcher owns a bounded Tokio mpsc queue and a single worker task.
//! Producers enqueue with [`AuditDispatcher::notify`], which never waits: a
//! full queue is signalled back as [`AuditError::QueueFull`]. The worker takes
//! events in FIFO order and hands each one to the observer.
//!
//! ## Shutdown
//!
//! [`AuditDispatcher::close`] drops the sending side of the queue. The worker
//! keeps delivering until the queue is empty and then exits; `close` returns
//! once it has, also when another `close` started the shutdown. Later calls
//! to `notify` fail with [`AuditError::Closed`].

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace};

use super::error::{AuditError, AuditResult};
use super::event::AuditEvent;
use super::AuditObserver;

/// Worker draining the audit queue
struct AuditWorker {
    receiver: mpsc::Receiver<AuditEvent>,
    observer: Arc<dyn AuditObserver>,
}

impl AuditWorker {
    #[instrument(skip(self))]
    async fn run(mut self) {
        debug!("starting audit worker");

        let mut delivered: u64 = 0;
        while let Some(event) = self.receiver.recv().await {
            trace!("delivering audit event for {} metrics", event.metrics.len());
            if let Err(e) = self.observer.handle(&event).await {
                error!("failed to deliver audit event: {}", e);
            }
            delivered += 1;
        }

        debug!("audit worker stopped after {} events", delivered);
    }
}

/// Handle to the audit queue and its worker
#[derive(Debug)]
pub struct AuditDispatcher {
    sender: Mutex<Option<mpsc::Sender<AuditEvent>>>,
    worker: AsyncMutex<Option<JoinHandle<()>>>,
    capacity: usize,
}

impl AuditDispatcher {
    /// Spawn a dispatcher with a queue of `capacity` events
    ///
    /// A capacity of zero is raised to one. Must be called within a Tokio
    /// runtime.
    pub fn spawn(capacity: usize, observer: Arc<dyn AuditObserver>) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);

        let worker = AuditWorker { receiver, observer };
        let handle = tokio::spawn(worker.run());

        Self {
            sender: Mutex::new(Some(sender)),
            worker: AsyncMutex::new(Some(handle)),
            capacity,
        }
    }

    /// Enqueue an event without waiting
    pub fn notify(&self, event: AuditEvent) -> AuditResult<()> {
        let sender = self.sender.lock();
        let sender = sender.as_ref().ok_or(AuditError::Closed)?;

        match sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(AuditError::QueueFull {
                capacity: self.capacity,
            }),
            Err(TrySendError::Closed(_)) => Err(AuditError::Closed),
        }
    }

    /// Stop accepting events, deliver everything still queued and wait for
    /// the worker to finish
    ///
    /// Every caller waits for the drain to finish; once it has, further calls
    /// return immediately.
    pub async fn close(&self) {
        // dropping the sender lets the worker drain and exit
        drop(self.sender.lock().take());

        // held until the worker exits so concurrent callers wait too
        let mut worker = self.worker.lock().await;
        if let Some(handle) = worker.take() {
            if let Err(e) = handle.await {
                error!("audit worker terminated abnormally: {}", e);
            }
            debug!("audit dispatcher closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Maximum number of queued events
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events waiting for the worker
    pub fn len(&self) -> usize {
        self.sender
            .lock()
            .as_ref()
            .map(|sender| self.capacity - sender.capacity())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
