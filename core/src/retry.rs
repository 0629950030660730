//! Bounded retry with exponential backoff
//!
//! Wraps any fallible async operation. Only errors reporting
//! [`ConfabError::is_retryable`] are retried; everything else propagates on
//! first occurrence without consuming an attempt budget.

use crate::error::{ConfabError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

/// Retry behavior for one call site. Stateless across invocations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Factor applied to the delay after each failed attempt.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            multiplier: 2.0,
        }
    }

    /// Delay to wait before the given 1-indexed attempt.
    ///
    /// Attempt 2 waits `initial_delay`, attempt 3 waits
    /// `initial_delay * multiplier`, and so on.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(2);
        self.initial_delay.mul_f64(self.multiplier.powi(exponent as i32))
    }
}

/// Run `operation` under `policy`, sleeping between retryable failures.
///
/// The final failure is returned with its original kind preserved. A success
/// after earlier failures returns the operation's result with no trace of
/// the failures beyond the emitted log events.
pub async fn retry_async<T, F, Fut>(policy: &RetryPolicy, what: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let wait = policy.delay_before(attempt + 1);
                warn!(
                    "{what} failed (attempt {attempt}/{}), retrying in {:?}: {err}",
                    policy.max_attempts, wait
                );
                sleep(wait).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_retryable() {
                    error!(
                        "{what} still failing after {} attempts: {err}",
                        policy.max_attempts
                    );
                }
                return Err(err);
            }
        }
    }
}
