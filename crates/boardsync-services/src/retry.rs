//! Exponential backoff for idempotent GitHub reads.
//!
//! Retried:
//! - Timeouts and connection failures
//! - 5xx server errors, 429 and 408
//!
//! Not retried:
//! - Other 4xx responses (including 401/403)
//! - Writes (creating or patching issues); those are reported to the caller

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};

pub const DEFAULT_INITIAL_DELAY_MS: u64 = 100;
pub const DEFAULT_MAX_DELAY_MS: u64 = 5000;

/// Backoff policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay before the first retry (doubles each attempt)
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_retries(3)
    }
}

impl RetryPolicy {
    /// Default delays with a custom retry count
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }

    /// Delay before retry number `attempt` (0-based), capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// True when a response status is worth retrying
pub fn should_retry_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

/// True when a transport error is worth retrying
pub fn should_retry_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    error.status().is_some_and(should_retry_status)
}

/// Run `operation` until it yields a non-retryable outcome or the policy is exhausted.
///
/// A retryable status on the final attempt is returned as-is so the caller
/// can turn it into a typed error.
pub async fn send_with_retry<F, Fut>(
    policy: &RetryPolicy,
    operation: F,
) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = policy.delay_for_attempt(attempt - 1);
            tracing::debug!(attempt, ?delay, "retrying GitHub request");
            tokio::time::sleep(delay).await;
        }

        let exhausted = attempt >= policy.max_retries;
        match operation().await {
            Ok(response) if should_retry_status(response.status()) && !exhausted => {
                tracing::warn!(
                    status = %response.status(),
                    attempt = attempt + 1,
                    "GitHub returned a retryable status"
                );
            }
            Ok(response) => return Ok(response),
            Err(e) if should_retry_error(&e) && !exhausted => {
                tracing::warn!(attempt = attempt + 1, error = %e, "GitHub request failed");
            }
            Err(e) => return Err(e),
        }
        attempt += 1;
    }
}
