//! Error types for the Postgres/Mongo data access layer.
//!
//! `DbError` is the layer-local taxonomy; [`DbError::into_match_error`]
//! collapses it into the pipeline-wide [`jobmatch_core::MatchError`] at the
//! DAL boundary, the same two-tier shape the rest of the pipeline uses for
//! its own internal errors.

use jobmatch_core::MatchError;
use thiserror::Error;

/// Database/cache error types local to this crate.
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection reset, server-side timeout, or a driver-reported
    /// transient failure. Retried by [`crate::retry::retry_transient`].
    #[error("transient database error: {0}")]
    Transient(String),

    /// SQL syntax, constraint violation, or privilege error. Never
    /// retried.
    #[error("fatal database error: {0}")]
    Fatal(String),

    /// Connection pool acquisition timed out.
    #[error("pool exhausted: {message}")]
    PoolExhausted { message: String, pool_size: usize },

    /// Row was missing a required field and was discarded.
    #[error("{entity} missing required field: {field}")]
    IncompleteRecord {
        entity: &'static str,
        field: &'static str,
    },

    /// Invalid argument supplied to a query builder.
    #[error("invalid {field}: {message}")]
    InvalidArgument {
        field: &'static str,
        message: String,
    },

    /// Result cache serialization/eviction fault.
    #[error("cache error: {0}")]
    Cache(String),
}

/// Result type alias for database operations.
pub type DbResult<T> = std::result::Result<T, DbError>;

impl DbError {
    #[must_use]
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            message: message.into(),
        }
    }

    /// Whether this error should be retried by the caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Collapse into the pipeline-wide error taxonomy.
    #[must_use]
    pub fn into_match_error(self) -> MatchError {
        match self {
            Self::Transient(msg) => MatchError::TransientDb(msg),
            Self::Fatal(msg) => MatchError::FatalDb(msg),
            Self::PoolExhausted { message, .. } => MatchError::ResourceExhausted(message),
            Self::IncompleteRecord { entity, field } => {
                MatchError::Validation(format!("{entity} missing required field: {field}"))
            }
            Self::InvalidArgument { field, message } => {
                MatchError::Validation(format!("invalid {field}: {message}"))
            }
            Self::Cache(msg) => MatchError::Cache(msg),
        }
    }
}

/// Heuristic classification of a driver error message as transient.
/// `tokio_postgres::Error` does not expose a stable "is this retryable"
/// predicate for every backend failure mode, so this mirrors the legacy
/// matcher's approach of pattern-matching on the message text.
#[must_use]
pub fn is_transient_message(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    lower.contains("connection reset")
        || lower.contains("connection closed")
        || lower.contains("broken pipe")
        || lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("server closed the connection")
        || lower.contains("too many connections")
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        Self::Cache(e.to_string())
    }
}

impl From<tokio_postgres::Error> for DbError {
    fn from(e: tokio_postgres::Error) -> Self {
        let msg = e.to_string();
        if is_transient_message(&msg) {
            Self::Transient(msg)
        } else {
            Self::Fatal(msg)
        }
    }
}

impl From<mongodb::error::Error> for DbError {
    fn from(e: mongodb::error::Error) -> Self {
        let msg = e.to_string();
        if is_transient_message(&msg) {
            Self::Transient(msg)
        } else {
            Self::Fatal(msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_is_retryable() {
        assert!(DbError::Transient("reset".into()).is_retryable());
        assert!(!DbError::Fatal("syntax".into()).is_retryable());
    }

    #[test]
    fn transient_messages_are_recognized() {
        assert!(is_transient_message("connection reset by peer"));
        assert!(is_transient_message("operation timed out"));
        assert!(!is_transient_message("syntax error at or near \"SELCT\""));
    }

    #[test]
    fn maps_into_pipeline_error_taxonomy() {
        let e = DbError::PoolExhausted {
            message: "timed out after 3000ms".into(),
            pool_size: 25,
        };
        assert!(matches!(e.into_match_error(), MatchError::ResourceExhausted(_)));
    }
}
