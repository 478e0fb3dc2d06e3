//! Bounded retries for collaborator calls (sheet reads and writes).
//!
//! The policy decides how many times and how long to wait; the caller
//! decides which errors are transient. A permanent error, or exhausting the
//! attempts, surfaces the error as is.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use postsync_core::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// Delay multiplied by the factor after every retry.
    Exponential(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `0` is treated as `1`.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
            backoff: Backoff::Exponential(1.5),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.write_max_attempts,
            base_delay: Duration::from_millis(config.write_retry_delay_ms),
            ..Self::default()
        }
    }

    /// A policy that tries exactly once.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential(factor) => {
                let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
                let scale = factor.powi(exponent);
                if scale.is_finite() && scale >= 0.0 {
                    self.base_delay.mul_f64(scale.min(1e6))
                } else {
                    self.base_delay
                }
            }
        }
    }

    /// Runs `operation` until it succeeds or the attempts are used up,
    /// retrying every error.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.
    pub async fn run<T, E, F, Fut>(&self, label: &str, operation: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_if(label, |_: &E| true, operation).await
    }

    /// Like [`RetryPolicy::run`], but an error for which `is_retriable`
    /// returns `false` is returned immediately.
    ///
    /// # Errors
    ///
    /// Returns the first non-retriable error, or the error of the final
    /// attempt.
    pub async fn run_if<T, E, P, F, Fut>(
        &self,
        label: &str,
        is_retriable: P,
        mut operation: F,
    ) -> Result<T, E>
    where
        E: Display,
        P: Fn(&E) -> bool,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1u32;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !is_retriable(&err) {
                        tracing::warn!(
                            operation = label,
                            attempt,
                            error = %err,
                            "collaborator call failed permanently; not retrying"
                        );
                        return Err(err);
                    }
                    if attempt >= max_attempts {
                        return Err(err);
                    }
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        operation = label,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "collaborator call failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
