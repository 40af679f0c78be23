//! Retry utilities for transient vendor failures.
//!
//! Provides classification of retryable errors, exponential backoff, and the
//! per-attempt timeout loop every adapter runs its HTTP calls through.

use serde_json::Value;
use std::future::Future;
use std::time::Duration;

use crate::config::ModelConfig;
use crate::error::{Result, VisionError};
use crate::sanitize::{sanitize_text, sanitize_value};

/// Base backoff delay in milliseconds
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Backoff ceiling in milliseconds
pub const DEFAULT_MAX_DELAY_MS: u64 = 5000;

/// Upstream statuses that will not change on retry.
const NON_RETRYABLE_STATUS: [u16; 4] = [400, 401, 403, 404];

/// Determine whether an error is worth retrying.
///
/// Retryable: timeouts, unknown failures, and upstream errors except bad
/// request, auth, and not-found. Client-side kinds (invalid input, image
/// load, configuration) never are.
pub fn is_retryable(error: &VisionError) -> bool {
    match error {
        VisionError::Timeout { .. } | VisionError::Unknown { .. } => true,
        VisionError::Api { status_code, .. } => match status_code {
            Some(code) => !NON_RETRYABLE_STATUS.contains(code),
            // transport failures (connection refused, DNS, reset)
            None => true,
        },
        VisionError::InvalidInput { .. }
        | VisionError::ImageLoad { .. }
        | VisionError::ModelConfig { .. } => false,
    }
}

/// Calculate exponential backoff duration for a given attempt.
///
/// Uses `base_delay * 2^attempt` capped at `max_delay_ms`.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64, max_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(max_delay_ms))
}

/// Attempt budget, per-attempt deadline and backoff shape for one adapter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    timeout: Duration,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, timeout: Duration) -> Self {
        Self {
            max_retries,
            timeout,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.max_retries, config.timeout())
    }

    /// Override the backoff curve (tests use millisecond delays).
    pub fn with_backoff(mut self, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self.max_delay_ms = max_delay_ms;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent.
    ///
    /// Each attempt is raced against the per-attempt deadline; an attempt
    /// that loses is dropped, which cancels its in-flight request. When the
    /// budget is exhausted a final timeout is returned as-is, any other final
    /// failure is wrapped into an API error recording the attempt count and
    /// the sanitized last error.
    pub async fn run<T, F, Fut>(&self, provider: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts();
        let mut last_error = None;

        for n in 0..attempts {
            if n > 0 {
                let delay = backoff_duration(n - 1, self.base_delay_ms, self.max_delay_ms);
                tracing::debug!(
                    provider,
                    attempt = n + 1,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after backoff"
                );
                tokio::time::sleep(delay).await;
            }

            let outcome = match tokio::time::timeout(self.timeout, attempt(n)).await {
                Ok(result) => result,
                Err(_) => Err(VisionError::timeout(self.timeout.as_millis() as u64)),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if !is_retryable(&e) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        provider,
                        attempt = n + 1,
                        max_attempts = attempts,
                        kind = %e.kind(),
                        status_code = e.status_code(),
                        retry_after_secs = e.retry_after_secs(),
                        "Attempt failed: {}",
                        sanitize_text(&e.message())
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(timeout @ VisionError::Timeout { .. }) => timeout,
            Some(last) => exhausted(provider, attempts, last),
            None => VisionError::api(provider, "no attempts were made", None),
        })
    }
}

fn exhausted(provider: &str, attempts: u32, last: VisionError) -> VisionError {
    let mut last_error = last.collected_details();
    last_error.insert("kind".into(), Value::from(last.kind().as_str()));
    last_error.insert("message".into(), Value::from(last.message()));

    VisionError::api(
        provider,
        format!(
            "failed after {attempts} attempts: {}",
            sanitize_text(&last.message())
        ),
        last.status_code(),
    )
    .with_retry_after(last.retry_after_secs())
    .with_detail("attempts", attempts)
    .with_detail("last_error", sanitize_value(Value::Object(last_error)))
}
