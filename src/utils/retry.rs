//! Retry utilities with exponential backoff for catalog requests.
//!
//! Each call to [`with_retry`] gets a fresh budget: retries are counted per
//! HTTP request, never per logical operation.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::client::{CatalogError, CatalogObserver, TracingObserver};

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Set the maximum number of attempts
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay after the first failure
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay before retrying after the failure of 0-based `attempt`.
    ///
    /// With the defaults this is `2^attempt` seconds: 1s, 2s, 4s, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        if capped.is_finite() && capped >= 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            self.max_delay
        }
    }
}

/// Execute an async operation with retry logic, reporting through `tracing`
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, CatalogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CatalogError>>,
{
    with_retry_observed(config, &TracingObserver, operation).await
}

/// Execute an async operation with retry logic
///
/// Transient failures (see [`CatalogError::is_transient`]) are retried until
/// `max_attempts` attempts have been made, sleeping [`RetryConfig::delay_for`]
/// between attempts; the last error is then returned. Any other error is
/// returned immediately.
pub async fn with_retry_observed<T, F, Fut>(
    config: &RetryConfig,
    observer: &dyn CatalogObserver,
    mut operation: F,
) -> Result<T, CatalogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CatalogError>>,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(
                        "Operation succeeded on attempt {} after {} transient failures",
                        attempt + 1,
                        attempt
                    );
                }
                return Ok(result);
            }
            Err(error) if error.is_transient() => {
                if attempt + 1 >= config.max_attempts {
                    observer.on_give_up(attempt + 1, &error);
                    return Err(error);
                }

                let delay = config.delay_for(attempt);
                observer.on_retry(attempt + 1, delay, &error);
                sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
