//! Bounded exponential backoff for transient fetch failures.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::models::RetryConfig;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Attempts per operation, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl BackoffPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry_index` (0 for the first retry).
    pub fn delay_for_retry(&self, retry_index: u32) -> Duration {
        let factor = 1u32.checked_shl(retry_index).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

/// Outcome of [`retry_transient`]: the final result plus retries spent.
#[derive(Debug)]
pub struct Retried<T> {
    pub result: Result<T>,
    pub retries: u32,
}

/// Run `op` until it succeeds, fails permanently, or attempts run out.
///
/// Only errors where [`AppError::is_transient`](crate::error::AppError::is_transient)
/// holds are retried.
pub async fn retry_transient<T, F, Fut>(policy: &BackoffPolicy, label: &str, mut op: F) -> Retried<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;
    loop {
        match op().await {
            Ok(value) => {
                return Retried {
                    result: Ok(value),
                    retries,
                };
            }
            Err(e) if e.is_transient() && retries + 1 < policy.max_attempts => {
                let delay = policy.delay_for_retry(retries);
                retries += 1;
                log::warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    label,
                    retries,
                    policy.max_attempts,
                    e,
                    delay
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => {
                return Retried {
                    result: Err(e),
                    retries,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = BackoffPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(policy.delay_for_retry(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for_retry(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let outcome = retry_transient(&BackoffPolicy::immediate(3), "page", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::RateLimited("429".into()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(outcome.result.unwrap(), 7);
        assert_eq!(outcome.retries, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let outcome: Retried<()> =
            retry_transient(&BackoffPolicy::immediate(3), "page", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::unreachable("timeout"))
            })
            .await;

        assert!(matches!(outcome.result, Err(AppError::Unreachable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.retries, 2);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let outcome: Retried<()> =
            retry_transient(&BackoffPolicy::immediate(5), "page", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::Unauthorized("apiKeyInvalid".into()))
            })
            .await;

        assert!(matches!(outcome.result, Err(AppError::Unauthorized(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
