//! Fixed-delay retry for upstream fetches.

use std::thread;
use std::time::Duration;

use super::client::FetchError;

/// How many times to attempt an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Pause between consecutive attempts. Constant; there is no growth.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A policy that tries exactly once.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Runs `f` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up.
///
/// Non-retryable errors are returned unchanged. When every attempt failed
/// with a retryable error the result is [`FetchError::RetriesExhausted`]
/// carrying the last cause.
pub fn retry_with_policy<F, T>(policy: &RetryPolicy, mut f: F) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Result<T, FetchError>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        let error = match f(attempt) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !should_retry(&error) {
            return Err(error);
        }

        if attempt >= attempts {
            return Err(FetchError::RetriesExhausted {
                attempts,
                last: Box::new(error),
            });
        }

        tracing::warn!(attempt, max_attempts = attempts, error = %error, "fetch failed, retrying");
        if !policy.delay.is_zero() {
            thread::sleep(policy.delay);
        }
        attempt += 1;
    }
}

/// Determines if an error should be retried.
///
/// Returns `true` for transport failures, timeouts, HTTP 5xx and HTTP 429.
/// Returns `false` for other client errors and for anything the extractor or
/// configuration rejected, since a second request would not change them.
pub fn should_retry(error: &FetchError) -> bool {
    match error {
        FetchError::Network(_) => true,
        FetchError::Timeout(_) => true,
        FetchError::Http { status } => *status == 429 || (500..600).contains(status),
        FetchError::Extract(_) => false,
        FetchError::InvalidUrl(_) => false,
        FetchError::RetriesExhausted { .. } => false,
    }
}
