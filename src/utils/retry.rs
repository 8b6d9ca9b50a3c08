//! Retry utilities with linear backoff for rate-limited providers.

use std::time::Duration;
use tokio::time::sleep;

use crate::providers::ProviderError;

/// Configuration for retry behavior
///
/// The delay before retry `n` (1-based) is `base_delay * n`, so the default
/// policy waits 2s, 4s and 6s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Delay unit multiplied by the retry number
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Set the maximum number of retries
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay
    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay to wait before the given retry (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(retry)
    }

    /// Maximum number of attempts including the first one
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Execute an async operation, retrying it while it reports a retryable error
///
/// Only [`ProviderError::is_retryable`] errors are retried; anything else is
/// returned immediately. `label` is used for logging.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ProviderError>>,
{
    let mut attempts: u32 = 0;
    let mut operation = operation;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::info!(
                        "{} succeeded on attempt {} after {} rate-limited attempts",
                        label,
                        attempts,
                        attempts - 1
                    );
                }
                return Ok(result);
            }
            Err(error) if error.is_retryable() => {
                if attempts >= policy.max_attempts() {
                    tracing::warn!("{} still failing after {} attempts: {}", label, attempts, error);
                    return Err(error);
                }

                let delay = policy.delay_for(attempts);
                tracing::debug!(
                    "{} attempt {} failed ({}), retrying in {:?}",
                    label,
                    attempts,
                    error,
                    delay
                );
                sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}
