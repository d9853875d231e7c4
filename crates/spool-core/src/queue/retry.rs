//! Retry policy: bounded attempts with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Retry policy applied to remote dispatch.
///
/// delay before retry n (1-indexed) = min(base_delay * multiplier^(n - 1), max_delay)
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Delay after the first failure.
    pub base_delay: Duration,

    /// Backoff multiplier.
    pub multiplier: f64,

    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

impl Default for RetryPolicy {
    /// 3 attempts, 1s then 2s.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after `attempts` failed attempts (1-indexed).
    ///
    /// Example with base_delay=1s, multiplier=2.0:
    /// - after attempt 1: 1s
    /// - after attempt 2: 2s
    /// - after attempt 3: 4s
    ///
    /// Never exceeds `max_delay`, however many attempts are configured.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = i32::try_from(attempts.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// All attempts failed (or a non-retryable error stopped early).
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub last_error: E,
    pub attempts: u32,
}

/// Run `operation` until it succeeds, the policy runs out of attempts, or it
/// returns an error `retryable` rejects.
pub async fn retry_async<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    operation_name: &str,
    retryable: P,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        debug!("{operation_name}: attempt {attempt}/{max_attempts}");

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && retryable(&e) => {
                let delay = policy.next_delay(attempt);
                warn!("{operation_name}: attempt {attempt} failed, retrying in {delay:?}: {e}");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!("{operation_name}: giving up after {attempt} attempt(s): {e}");
                return Err(RetryExhausted {
                    last_error: e,
                    attempts: attempt,
                });
            }
        }
    }
}
