//! Error types for nodemap.
//!
//! Domain errors (empty criteria, unindexed properties, bad finder calls,
//! metadata failures) are programming or configuration mistakes and are never
//! retried. Infrastructure errors wrap the SQLite, IO and JSON layers.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the nodemap library.
#[derive(Debug, Error)]
pub enum NodemapError {
    // Query compilation errors
    #[error("The criteria passed to a find method can not be empty")]
    EmptyCriteria,

    #[error("Property {property} is not indexed on {entity}")]
    UnindexedProperty {
        entity: String,
        property: String,
        /// Whether the entity declares the property at all.
        declared: bool,
    },

    #[error("Invalid finder call {call}: method name must begin with \"findBy\" or \"findOneBy\" and take exactly one argument")]
    InvalidDispatch { call: String },

    // Metadata errors
    #[error("Metadata error for {entity}: {message}")]
    Metadata { entity: String, message: String },

    #[error("Entity type mismatch: expected {expected}, got {found}")]
    EntityTypeMismatch { expected: String, found: String },

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for nodemap operations.
pub type Result<T> = std::result::Result<T, NodemapError>;

impl From<std::io::Error> for NodemapError {
    fn from(err: std::io::Error) -> Self {
        NodemapError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for NodemapError {
    fn from(err: serde_json::Error) -> Self {
        NodemapError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for NodemapError {
    fn from(err: rusqlite::Error) -> Self {
        NodemapError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl NodemapError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        NodemapError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a metadata error for the named entity.
    pub fn metadata(entity: impl Into<String>, message: impl Into<String>) -> Self {
        NodemapError::Metadata {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Error used whenever the connection mutex is poisoned.
    pub(crate) fn lock_poisoned() -> Self {
        NodemapError::Database {
            message: "Failed to acquire connection lock".to_string(),
            source: None,
        }
    }

    /// Check if this error should trigger a retry.
    ///
    /// Only a busy or locked database and a poisoned connection lock qualify.
    /// Query syntax errors reported by SQLite depend on the input alone.
    pub fn is_retryable(&self) -> bool {
        match self {
            NodemapError::Database { source: None, .. } => true,
            NodemapError::Database {
                source: Some(err), ..
            } => matches!(
                err.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }
}
