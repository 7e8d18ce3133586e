//! Retry policy with exponential backoff for model loading
//!
//! Transient failures (connection errors, timeouts, 429/5xx) are retried with
//! exponentially growing sleeps; permanent failures (401/403/404, model not
//! served) fail immediately.

use crate::domain::models::RetryConfig;
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::warn;

/// Outcome of one attempt that did not succeed
#[derive(Debug)]
pub enum AttemptError {
    /// Worth retrying after a backoff
    Transient(anyhow::Error),
    /// Retrying cannot help
    Permanent(anyhow::Error),
}

impl AttemptError {
    pub fn into_inner(self) -> anyhow::Error {
        match self {
            Self::Transient(e) | Self::Permanent(e) => e,
        }
    }

    /// Classify an HTTP status from the inference server
    pub fn from_status(status: reqwest::StatusCode, error: anyhow::Error) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Self::Transient(error)
        } else {
            Self::Permanent(error)
        }
    }

    /// Classify a transport-level error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::Transient(err.into())
        } else {
            Self::Permanent(err.into())
        }
    }
}

/// Exponential backoff: `initial * 2^attempt`, capped at `max`
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff_ms: config.initial_backoff_ms,
            max_backoff_ms: config.max_backoff_ms,
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Backoff before retry number `attempt + 1`
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt);
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(backoff_ms)
    }

    /// Run `operation` until it succeeds, fails permanently or retries run out
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Permanent(err)) => {
                    warn!(error = %err, "Permanent error encountered, not retrying");
                    return Err(err);
                }
                Err(AttemptError::Transient(err)) => {
                    if attempt >= self.max_retries {
                        warn!(
                            attempt,
                            max_retries = self.max_retries,
                            error = %err,
                            "Max retries exhausted"
                        );
                        return Err(err);
                    }

                    let backoff = self.calculate_backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Retrying after error"
                    );

                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}
