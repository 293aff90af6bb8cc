//! Bounded retry with a fixed delay.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::config::Config;
use crate::error::{Error, Result};

/// Fixed-delay retry policy.
///
/// `max_attempts` counts every attempt, the first included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least 1.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Policy taken from configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self::new(config.max_retry_attempts, config.retry_delay)
    }

    /// Runs `operation` until it succeeds, is cancelled, or the attempts run
    /// out. The attempt number (starting at 1) is passed in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires or the operation reports
    /// cancellation, and [`Error::RetriesExhausted`] with the last failure
    /// once every attempt failed.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = triagedesk_api::Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let err = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_cancelled() => return Err(Error::Cancelled),
                Err(err) => err,
            };

            if attempt >= max_attempts {
                return Err(Error::RetriesExhausted {
                    attempts: attempt,
                    message: err.to_string(),
                });
            }

            warn!(
                attempt,
                max_attempts,
                transient = err.is_transient(),
                error = %err,
                "Attempt failed, retrying"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(self.delay) => {}
            }
            attempt += 1;
        }
    }
}
