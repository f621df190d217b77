//! Retry classification of storage errors
//!
//! Classification is a pure function of the error. Database errors are looked
//! up by their code in a static table. A failure to obtain a connection is
//! retriable. Every other error, and every code not in the table, is
//! non-retriable so unknown failures fail fast instead of being retried.
//!
//! ## Recognised codes
//!
//! | Class        | PostgreSQL SQLSTATE                               | SQLite result code         |
//! |--------------|---------------------------------------------------|----------------------------|
//! | Retriable    | 08000 08003 08006 40000 40001 40P01 57P03         | 5 6 261 262 517            |
//! | NonRetriable | 22000 22004 23000 23001 23502 23503 23505 23514   | 1 19 275 787 1299 1555 2067 |
//! |              | 42000 42601 42703 42P01 42883                     |                            |

use super::error::StorageError;

/// Whether an operation that failed with an error may succeed when repeated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retriable,
    NonRetriable,
}

const ERROR_CODES: &[(&str, ErrorClass)] = &[
    // PostgreSQL: connection exception class
    ("08000", ErrorClass::Retriable),
    ("08003", ErrorClass::Retriable),
    ("08006", ErrorClass::Retriable),
    // PostgreSQL: transaction rollback class
    ("40000", ErrorClass::Retriable),
    ("40001", ErrorClass::Retriable),
    ("40P01", ErrorClass::Retriable),
    // PostgreSQL: cannot_connect_now
    ("57P03", ErrorClass::Retriable),
    // PostgreSQL: data exception class
    ("22000", ErrorClass::NonRetriable),
    ("22004", ErrorClass::NonRetriable),
    // PostgreSQL: integrity constraint violation class
    ("23000", ErrorClass::NonRetriable),
    ("23001", ErrorClass::NonRetriable),
    ("23502", ErrorClass::NonRetriable),
    ("23503", ErrorClass::NonRetriable),
    ("23505", ErrorClass::NonRetriable),
    ("23514", ErrorClass::NonRetriable),
    // PostgreSQL: syntax error or access rule violation class
    ("42000", ErrorClass::NonRetriable),
    ("42601", ErrorClass::NonRetriable),
    ("42703", ErrorClass::NonRetriable),
    ("42P01", ErrorClass::NonRetriable),
    ("42883", ErrorClass::NonRetriable),
    // SQLite: BUSY, LOCKED, BUSY_RECOVERY, LOCKED_SHAREDCACHE, BUSY_SNAPSHOT
    ("5", ErrorClass::Retriable),
    ("6", ErrorClass::Retriable),
    ("261", ErrorClass::Retriable),
    ("262", ErrorClass::Retriable),
    ("517", ErrorClass::Retriable),
    // SQLite: ERROR (syntax, missing table), CONSTRAINT and its extended codes
    ("1", ErrorClass::NonRetriable),
    ("19", ErrorClass::NonRetriable),
    ("275", ErrorClass::NonRetriable),
    ("787", ErrorClass::NonRetriable),
    ("1299", ErrorClass::NonRetriable),
    ("1555", ErrorClass::NonRetriable),
    ("2067", ErrorClass::NonRetriable),
];

/// Classify a storage error for the retry decorator
pub fn classify(err: &StorageError) -> ErrorClass {
    match err {
        StorageError::Database {
            code: Some(code), ..
        } => classify_code(code),
        // no connection could be obtained in time; a closed pool is unhealthy
        StorageError::ConnectionFailed(_) => ErrorClass::Retriable,
        _ => ErrorClass::NonRetriable,
    }
}

/// Look up a raw database error code
pub fn classify_code(code: &str) -> ErrorClass {
    ERROR_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, class)| *class)
        .unwrap_or(ErrorClass::NonRetriable)
}

impl StorageError {
    pub fn is_retriable(&self) -> bool {
        classify(self) == ErrorClass::Retriable
    }
}
