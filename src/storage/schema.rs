//! Metric kinds and the records exchanged with storage
//!
//! ## Two shapes of a metric
//!
//! - [`Metric`] is the typed form used inside the crate, e.g. for batch
//!   updates. A gauge always carries a value, a counter always a delta.
//! - [`MetricRecord`] is the wire form written to snapshot files:
//!
//! ```text
//! [
//! 	{ "id": "alloc", "type": "gauge", "value": 123.45 },
//! 	{ "id": "requests", "type": "counter", "delta": 1 }
//! ]
//! ```
//!
//! The `type` field stays a plain string on the wire so that a record with a
//! kind we do not know can be reported precisely instead of failing the
//! whole document as malformed JSON.

use serde::{Deserialize, Serialize};

use super::error::{StorageError, StorageResult};

/// Kind of a metric
///
/// Names are unique per kind: a gauge and a counter may share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Last-write-wins float value
    Gauge,

    /// Accumulating integer value
    Counter,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }

    /// Parse the wire representation, `None` for unknown kinds
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "gauge" => Some(MetricKind::Gauge),
            "counter" => Some(MetricKind::Counter),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single typed metric update
#[derive(Debug, Clone, PartialEq)]
pub enum Metric {
    Gauge { name: String, value: f64 },
    Counter { name: String, delta: i64 },
}

impl Metric {
    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Metric::Gauge {
            name: name.into(),
            value,
        }
    }

    pub fn counter(name: impl Into<String>, delta: i64) -> Self {
        Metric::Counter {
            name: name.into(),
            delta,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Metric::Gauge { name, .. } | Metric::Counter { name, .. } => name,
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Gauge { .. } => MetricKind::Gauge,
            Metric::Counter { .. } => MetricKind::Counter,
        }
    }
}

/// A metric as it appears in a snapshot file
///
/// `delta` is present only for counters and holds the absolute accumulated
/// total, `value` only for gauges. Absent fields are omitted, never `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub id: String,

    #[serde(rename = "type")]
    pub mtype: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl From<&Metric> for MetricRecord {
    fn from(metric: &Metric) -> Self {
        match metric {
            Metric::Gauge { name, value } => MetricRecord {
                id: name.clone(),
                mtype: MetricKind::Gauge.to_string(),
                delta: None,
                value: Some(*value),
            },
            Metric::Counter { name, delta } => MetricRecord {
                id: name.clone(),
                mtype: MetricKind::Counter.to_string(),
                delta: Some(*delta),
                value: None,
            },
        }
    }
}

impl TryFrom<MetricRecord> for Metric {
    type Error = StorageError;

    fn try_from(record: MetricRecord) -> StorageResult<Self> {
        let kind = MetricKind::parse(&record.mtype).ok_or_else(|| {
            StorageError::UnknownMetricKind {
                id: record.id.clone(),
                kind: record.mtype.clone(),
            }
        })?;

        match (kind, record.value, record.delta) {
            (MetricKind::Gauge, Some(value), _) => Ok(Metric::Gauge {
                name: record.id,
                value,
            }),
            (MetricKind::Counter, _, Some(delta)) => Ok(Metric::Counter {
                name: record.id,
                delta,
            }),
            (kind, _, _) => Err(StorageError::MissingValue {
                id: record.id,
                kind,
            }),
        }
    }
}
