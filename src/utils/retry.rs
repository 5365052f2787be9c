//! Retry with exponential backoff for backend requests.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::sources::SourceError;

/// How often, and how patiently, a failing request is repeated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub attempts: u32,
    /// Pause after the first failure; doubled after each further one
    pub first_delay: Duration,
    pub max_delay: Duration,
    /// Deadline for a single attempt
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Short and shallow: a person is waiting on the result
    pub fn interactive() -> Self {
        Self {
            attempts: 2,
            first_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(10),
        }
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    fn pause_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.first_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Run `operation` until it succeeds, fails permanently, or runs out of
/// attempts.
///
/// Only errors for which [`SourceError::is_transient`] holds are retried.
/// An attempt that exceeds `attempt_timeout` counts as a timeout.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut attempt = 1;
    loop {
        let result = match timeout(policy.attempt_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout),
        };

        match result {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!("Request succeeded on attempt {}", attempt);
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < policy.attempts => {
                let pause = policy.pause_after(attempt);
                tracing::debug!("Attempt {} failed ({}), retrying in {:?}", attempt, e, pause);
                sleep(pause).await;
                attempt += 1;
            }
            Err(e) => {
                if attempt > 1 {
                    tracing::warn!("Request failed after {} attempts: {}", attempt, e);
                }
                return Err(e);
            }
        }
    }
}
