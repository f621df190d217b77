//! Audit observer appending events to a JSON-lines file

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::trace;

use super::AuditObserver;
use super::error::AuditResult;
use super::event::AuditEvent;

/// Appends one JSON-encoded event per line to a file
///
/// The file is opened and closed for every event, so each line is on disk
/// once `handle` returns and the file can be rotated at any time.
#[derive(Debug, Clone)]
pub struct FileObserver {
    path: PathBuf,
}

impl FileObserver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditObserver for FileObserver {
    async fn handle(&self, event: &AuditEvent) -> AuditResult<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        trace!("appended audit event to {}", self.path.display());
        Ok(())
    }
}
