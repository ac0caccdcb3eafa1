//! Bounded retry for transient database errors.
//!
//! Unlike the mail-search layer's circuit-breaker-backed retry loop, the
//! matching pipeline's failure model calls for a flat, deadline-bound
//! policy: retry a transient error up to twice, with exponential backoff
//! capped at 500ms total, then surface it.

use std::time::Duration;

use tracing::warn;

use crate::error::DbError;

/// Maximum number of retry attempts after the initial try.
pub const MAX_RETRIES: u32 = 2;

/// Backoff ceiling across all retries combined.
pub const MAX_BACKOFF: Duration = Duration::from_millis(500);

/// Base delay for the first retry; doubles on each subsequent attempt,
/// capped by [`MAX_BACKOFF`].
const BASE_DELAY: Duration = Duration::from_millis(100);

fn delay_for_attempt(attempt: u32) -> Duration {
    let scaled = BASE_DELAY.saturating_mul(1 << attempt.min(8));
    scaled.min(MAX_BACKOFF)
}

/// Run `op`, retrying transient [`DbError`]s up to [`MAX_RETRIES`] times
/// with capped exponential backoff. Fatal errors and non-transient
/// failures are returned immediately.
pub async fn retry_transient<T, F, Fut>(op_name: &str, mut op: F) -> Result<T, DbError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, DbError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < MAX_RETRIES => {
                let delay = delay_for_attempt(attempt);
                warn!(
                    operation = op_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying transient database error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_is_capped_and_monotonic() {
        let mut prev = Duration::ZERO;
        for attempt in 0..10 {
            let d = delay_for_attempt(attempt);
            assert!(d <= MAX_BACKOFF);
            assert!(d >= prev || d == MAX_BACKOFF);
            prev = d;
        }
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = retry_transient("test_op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(DbError::Transient("reset".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), DbError> = retry_transient("test_op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DbError::Transient("reset".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES + 1);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), DbError> = retry_transient("test_op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DbError::Fatal("syntax error".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
