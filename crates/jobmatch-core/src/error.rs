//! Error taxonomy for the job matching core.
//!
//! Mirrors the error categories used by the legacy Python matcher
//! (`app/libs/job_matcher/exceptions.py`) but gives each category the
//! retry/surfacing policy it carries through the pipeline.

use thiserror::Error;

/// Result type alias for matching-core operations.
pub type MatchResult<T> = std::result::Result<T, MatchError>;

/// Top-level error type returned by the matching pipeline.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Malformed input: bad radius, mismatched embedding dimension, or an
    /// unknown filter value that cannot simply be dropped.
    #[error("validation error: {0}")]
    Validation(String),

    /// Connection reset or server-side timeout. Retried by the caller up to
    /// twice with exponential backoff capped at 500ms before surfacing.
    #[error("transient database error: {0}")]
    TransientDb(String),

    /// SQL syntax, constraint, or privilege error. Never retried.
    #[error("fatal database error: {0}")]
    FatalDb(String),

    /// Connection pool acquisition timed out.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Deadline exceeded or the caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// Serialization or eviction fault in the result cache. Caught by the
    /// orchestrator; the pipeline proceeds without caching.
    #[error("cache error: {0}")]
    Cache(String),
}

impl MatchError {
    /// Whether a caller should retry this error (only `TransientDb`).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientDb(_))
    }

    /// Stable error code for logging/telemetry, mirroring the legacy
    /// exception class names.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::TransientDb(_) => "TRANSIENT_DB_ERROR",
            Self::FatalDb(_) => "FATAL_DB_ERROR",
            Self::ResourceExhausted(_) => "RESOURCE_EXHAUSTED",
            Self::Cancelled => "CANCELLED",
            Self::Cache(_) => "CACHE_ERROR",
        }
    }
}

/// Internal sum-type branch for a soft pipeline downgrade (reranker or
/// explainer failure). Never surfaced to the caller: the orchestrator
/// catches it, logs a warning, and proceeds with the degraded result.
#[derive(Debug, Error)]
#[error("downgrade: {reason}")]
pub struct DowngradeSignal {
    pub reason: String,
}

impl DowngradeSignal {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_db_is_retryable() {
        assert!(MatchError::TransientDb("reset".into()).is_retryable());
        assert!(!MatchError::FatalDb("syntax".into()).is_retryable());
        assert!(!MatchError::Validation("bad radius".into()).is_retryable());
        assert!(!MatchError::ResourceExhausted("pool".into()).is_retryable());
        assert!(!MatchError::Cancelled.is_retryable());
        assert!(!MatchError::Cache("serde".into()).is_retryable());
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            MatchError::Validation(String::new()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(MatchError::Cancelled.error_code(), "CANCELLED");
    }
}
