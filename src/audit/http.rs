//! Audit observer posting events to a webhook

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{instrument, trace, warn};

use super::AuditObserver;
use super::error::AuditResult;
use super::event::AuditEvent;

/// Timeout for a single audit request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// POSTs every event as JSON to a fixed URL
///
/// Delivery is fire-and-forget: a non-2xx answer is logged but not treated as
/// a failure. Only transport errors (refused connection, timeout, ...) are
/// returned.
#[derive(Debug, Clone)]
pub struct HttpObserver {
    client: Client,
    url: String,
}

impl HttpObserver {
    pub fn new(url: impl Into<String>) -> AuditResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AuditObserver for HttpObserver {
    #[instrument(skip(self, event), fields(url = %self.url))]
    async fn handle(&self, event: &AuditEvent) -> AuditResult<()> {
        let response = self.client.post(&self.url).json(event).send().await?;

        if response.status().is_success() {
            trace!("audit event accepted");
        } else {
            warn!("audit endpoint answered with status: {}", response.status());
        }

        Ok(())
    }
}
