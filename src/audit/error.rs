//! Error types for the audit subsystem

use std::fmt;

/// Result type alias for audit operations
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors that can occur while dispatching or delivering audit events
#[derive(Debug)]
pub enum AuditError {
    /// The dispatcher queue is full, the event was not accepted
    QueueFull { capacity: usize },

    /// The dispatcher has been closed
    Closed,

    /// Writing the audit file failed
    Io(std::io::Error),

    /// The audit endpoint could not be reached
    Http(reqwest::Error),

    /// The event could not be encoded
    Serialization(serde_json::Error),
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditError::QueueFull { capacity } => {
                write!(f, "audit queue is full ({} events)", capacity)
            }
            AuditError::Closed => write!(f, "audit dispatcher is closed"),
            AuditError::Io(err) => write!(f, "audit file error: {}", err),
            AuditError::Http(err) => write!(f, "audit request failed: {}", err),
            AuditError::Serialization(err) => write!(f, "audit event encoding failed: {}", err),
        }
    }
}

impl std::error::Error for AuditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuditError::Io(err) => Some(err),
            AuditError::Http(err) => Some(err),
            AuditError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AuditError {
    fn from(err: std::io::Error) -> Self {
        AuditError::Io(err)
    }
}

impl From<reqwest::Error> for AuditError {
    fn from(err: reqwest::Error) -> Self {
        AuditError::Http(err)
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        AuditError::Serialization(err)
    }
}
