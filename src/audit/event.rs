//! Audit event definition

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Record of which metrics were updated, when and by whom
///
/// Serialized as `{"ts": 1700000000, "metrics": ["alloc"], "ip_address": "10.0.0.1"}`
/// both in the audit file and in webhook bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unix timestamp in seconds
    pub ts: i64,

    /// Updated metric names, in update order
    pub metrics: Vec<String>,

    /// Address of the client that performed the update
    pub ip_address: String,
}

impl AuditEvent {
    pub fn new(ts: i64, metrics: Vec<String>, ip_address: impl Into<String>) -> Self {
        Self {
            ts,
            metrics,
            ip_address: ip_address.into(),
        }
    }

    /// Create an event stamped with the current time
    pub fn now(metrics: Vec<String>, ip_address: impl Into<String>) -> Self {
        Self::new(Utc::now().timestamp(), metrics, ip_address)
    }
}
