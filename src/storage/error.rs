//! Error types for storage operations

use std::fmt;

use super::schema::MetricKind;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations
#[derive(Debug)]
pub enum StorageError {
    /// The requested metric has never been written
    NotFound { kind: MetricKind, name: String },

    /// The stored kind of a metric disagrees with the requested kind
    TypeMismatch {
        name: String,
        expected: MetricKind,
        found: String,
    },

    /// The kind matches but the relevant value column is NULL
    NullValue { name: String, kind: MetricKind },

    /// Error reported by the database, carrying the driver's error code
    ///
    /// For PostgreSQL this is the SQLSTATE, for SQLite the (extended) result
    /// code. The code drives retry classification.
    Database {
        code: Option<String>,
        message: String,
    },

    /// Database connection failed
    ConnectionFailed(String),

    /// Migration failed
    MigrationFailed(String),

    /// The backend did not answer the liveness probe
    UnhealthyBackend(String),

    /// Metric serialization/deserialization error
    SerializationError(String),

    /// A snapshot record names a metric kind this store does not know
    UnknownMetricKind { id: String, kind: String },

    /// A snapshot record lacks the field its kind requires
    MissingValue { id: String, kind: MetricKind },

    /// The retry decorator gave up
    RetriesExhausted {
        attempts: u32,
        source: Box<StorageError>,
    },

    /// I/O error (file access, etc.)
    IoError(std::io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound { kind, name } => {
                write!(f, "{} metric '{}' not found", kind, name)
            }
            StorageError::TypeMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "metric '{}' has type '{}', expected '{}'",
                name, found, expected
            ),
            StorageError::NullValue { name, kind } => {
                write!(f, "{} metric '{}' has no stored value", kind, name)
            }
            StorageError::Database { code, message } => match code {
                Some(code) => write!(f, "database error [{}]: {}", code, message),
                None => write!(f, "database error: {}", message),
            },
            StorageError::ConnectionFailed(msg) => {
                write!(f, "failed to connect to storage backend: {}", msg)
            }
            StorageError::MigrationFailed(msg) => write!(f, "database migration failed: {}", msg),
            StorageError::UnhealthyBackend(msg) => write!(f, "storage backend unhealthy: {}", msg),
            StorageError::SerializationError(msg) => {
                write!(f, "metric serialization error: {}", msg)
            }
            StorageError::UnknownMetricKind { id, kind } => {
                write!(f, "metric '{}' has unknown type '{}'", id, kind)
            }
            StorageError::MissingValue { id, kind } => {
                write!(f, "{} metric '{}' is missing its value", kind, id)
            }
            StorageError::RetriesExhausted { attempts, source } => {
                write!(f, "operation failed after {} attempts: {}", attempts, source)
            }
            StorageError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(err) => Some(err),
            StorageError::RetriesExhausted { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

#[cfg(feature = "storage-sqlite")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => StorageError::Database {
                code: db_err.code().map(|code| code.into_owned()),
                message: db_err.message().to_string(),
            },
            sqlx::Error::Io(io_err) => StorageError::IoError(io_err),
            sqlx::Error::PoolTimedOut => StorageError::ConnectionFailed(err.to_string()),
            sqlx::Error::PoolClosed => StorageError::UnhealthyBackend(err.to_string()),
            _ => StorageError::Database {
                code: None,
                message: err.to_string(),
            },
        }
    }
}

#[cfg(feature = "storage-sqlite")]
impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StorageError::MigrationFailed(err.to_string())
    }
}
