//! Retry-with-backoff for external provider calls.
//!
//! Each attempt is classified into an [`Attempt`]; only
//! [`Attempt::Retryable`] outcomes are tried again, after an exponentially
//! growing delay capped at `max_delay`.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{ReelError, ReelResult};

/// Classified outcome of a single attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    Success(T),
    Retryable(ReelError),
    Fatal(ReelError),
}

impl<T> From<ReelResult<T>> for Attempt<T> {
    fn from(result: ReelResult<T>) -> Self {
        match result {
            Ok(value) => Attempt::Success(value),
            Err(e) if e.is_retryable() => Attempt::Retryable(e),
            Err(e) => Attempt::Fatal(e),
        }
    }
}

/// Attempt count and delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Never zero.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Policy without waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before attempt `failed_attempt + 1`: `base * 2^(failed_attempt - 1)`.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Run `op` until it succeeds, fails fatally, or the attempt budget is spent.
///
/// `op` receives the 1-based attempt number.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> ReelResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ReelResult<T>>,
{
    let mut attempt = 1;
    loop {
        match Attempt::from(op(attempt).await) {
            Attempt::Success(value) => return Ok(value),
            Attempt::Fatal(e) => return Err(e),
            Attempt::Retryable(e) if attempt >= policy.max_attempts => {
                tracing::error!(
                    operation,
                    attempts = attempt,
                    error = %e,
                    "Giving up after retries"
                );
                return Err(e);
            }
            Attempt::Retryable(e) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(350));
        assert_eq!(policy.delay_after(40), Duration::from_millis(350));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        let policy = RetryPolicy::from_config(&RetryConfig {
            max_attempts: 0,
            base_delay_ms: 0,
            max_delay_ms: 0,
        });
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&RetryPolicy::immediate(3), "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(ReelError::rate_limited("fake", "slow down"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let err = with_retry(&RetryPolicy::immediate(5), "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ReelError::invalid_response("fake", "garbage")) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ReelError::ProviderInvalidResponse { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);
        let err = with_retry(&RetryPolicy::immediate(2), "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ReelError::timeout("fake", "deadline")) }
        })
        .await
        .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
