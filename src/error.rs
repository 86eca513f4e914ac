//! Error types for sqlite-relay.
//!
//! This module defines all error types using `thiserror`. The taxonomy mirrors
//! how failures are handled at runtime: connectivity errors are retried by the
//! supervisor, everything else is reported once against the request that
//! caused it and never crashes the hosting process.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to open the database file or acquire a pooled handle.
    /// Retried on a fixed interval by the connection supervisor.
    #[error("Connection failed for '{database}': {message}")]
    Connection { database: String, message: String },

    /// Missing or invalid node configuration (unset SQL, missing params,
    /// missing database config). Reported immediately, never retried.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The engine rejected the statement during prepare/execute/exec or
    /// while loading an extension. Caught per request.
    #[error("Execution error: {message}")]
    Execution {
        message: String,
        /// Engine extended error code, e.g. 1555 for a primary-key conflict.
        code: Option<i32>,
    },

    /// The inbound message had the wrong shape (non-string query field,
    /// mismatched bind arity). Reported, execution skipped.
    #[error("Invalid input: {message}")]
    InputShape { message: String },
}

impl DbError {
    /// Create a connection error for the named database.
    pub fn connection(database: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            database: database.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an execution error without an engine code.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            code: None,
        }
    }

    /// Create an input-shape error.
    pub fn input_shape(message: impl Into<String>) -> Self {
        Self::InputShape {
            message: message.into(),
        }
    }

    /// Check if this error is retryable. Only connectivity failures are;
    /// the supervisor keeps re-probing those, everything else is final for
    /// the request that produced it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// Convert engine errors into execution errors, preserving the extended
/// result code when the engine provides one.
impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg) => DbError::Execution {
                message: msg.clone().unwrap_or_else(|| err.to_string()),
                code: Some(code.extended_code),
            },
            _ => DbError::execution(err.to_string()),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("/data/app.db", "unable to open database file");
        assert!(err.to_string().contains("/data/app.db"));
        assert!(err.to_string().contains("unable to open"));
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::connection("db", "locked").is_retryable());
        assert!(!DbError::config("SQL statement config not set up").is_retryable());
        assert!(!DbError::execution("syntax error").is_retryable());
        assert!(!DbError::input_shape("topic is not a string").is_retryable());
    }

    #[test]
    fn test_engine_error_conversion_keeps_code() {
        let engine_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ffi::ErrorCode::ConstraintViolation,
                extended_code: 1555,
            },
            Some("UNIQUE constraint failed: t.id".to_string()),
        );
        let err = DbError::from(engine_err);
        match err {
            DbError::Execution { code, message } => {
                assert_eq!(code, Some(1555));
                assert!(message.contains("UNIQUE constraint"));
            }
            other => panic!("expected Execution, got {other:?}"),
        }
    }
}
