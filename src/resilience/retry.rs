//! Retry with exponential backoff
//!
//! Delay before retry `n` (0-indexed) is
//! `min(base_delay * backoff_factor^n, max_delay)`.
//!
//! | Preset           | Retries | Base   | Cap  |
//! |------------------|---------|--------|------|
//! | `initialization` | 3       | 2s     | 30s  |
//! | `search`         | 2       | 500ms  | 5s   |
//! | `write`          | 2       | 500ms  | 5s   |
//! | `none`           | 0       | -      | -    |

use crate::error::{GatewayError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Backoff parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt (total attempts = max_retries + 1)
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier applied per retry
    pub backoff_factor: f64,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::search()
    }
}

impl RetryConfig {
    /// Backend connection and index setup
    pub fn initialization() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Read path
    pub fn search() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }

    /// Writes that carry a dedup key and are therefore safe to replay
    pub fn write() -> Self {
        Self::search()
    }

    /// Single attempt
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            backoff_factor: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(GatewayError::Config(format!(
                "retry backoff_factor must be a finite value >= 1.0, got {}",
                self.backoff_factor
            )));
        }
        if self.max_delay < self.base_delay {
            return Err(GatewayError::Config(
                "retry max_delay must be >= base_delay".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay to wait after failed attempt `attempt` (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);

        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }
}

/// Re-invokes a fallible async operation with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute `operation`, retrying retryable failures
    ///
    /// Errors for which [`GatewayError::is_retryable`] is false are returned
    /// immediately. Once retries are exhausted the last error is returned
    /// unchanged.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("{} succeeded after {} retries", operation_name, attempt);
                    }
                    return Ok(result);
                }
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.delay_for_attempt(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                        operation_name,
                        attempt + 1,
                        self.config.max_retries + 1,
                        err,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if attempt > 0 {
                        warn!(
                            "{} failed after {} attempts: {}",
                            operation_name,
                            attempt + 1,
                            err
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[test]
    fn test_delay_schedule() {
        let config = RetryConfig {
            max_retries: 10,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5),
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(4), Duration::from_secs(5));
        assert_eq!(config.delay_for_attempt(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_presets() {
        let init = RetryConfig::initialization();
        assert_eq!(init.max_retries, 3);
        assert_eq!(init.base_delay, Duration::from_secs(2));

        let search = RetryConfig::search();
        assert_eq!(search.max_retries, 2);
        assert_eq!(search.max_delay, Duration::from_secs(5));

        assert_eq!(RetryConfig::none().max_retries, 0);

        for preset in [init, search, RetryConfig::write(), RetryConfig::none()] {
            assert!(preset.validate().is_ok());
        }
    }

    #[test]
    fn test_validation() {
        let mut config = RetryConfig::search();
        config.backoff_factor = 0.5;
        assert!(config.validate().is_err());

        let mut config = RetryConfig::search();
        config.max_delay = Duration::from_millis(100);
        assert!(config.validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let policy = RetryPolicy::new(RetryConfig {
            max_retries: 4,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5),
        });
        let attempts = Mutex::new(Vec::new());

        let result: Result<()> = policy
            .execute("always_fails", || {
                let mut attempts = attempts.lock().unwrap();
                attempts.push(Instant::now());
                let n = attempts.len();
                async move { Err(GatewayError::Remote(format!("failure #{}", n))) }
            })
            .await;

        let attempts = attempts.into_inner().unwrap();
        assert_eq!(attempts.len(), 5);

        match result {
            Err(GatewayError::Remote(msg)) => assert_eq!(msg, "failure #5"),
            other => panic!("unexpected result: {:?}", other),
        }

        let delays: Vec<Duration> = attempts.windows(2).map(|w| w[1] - w[0]).collect();
        let expected = [1, 2, 4, 5].map(Duration::from_secs);
        for (actual, expected) in delays.iter().zip(expected) {
            // The paused clock jumps straight to timer deadlines (millisecond resolution)
            assert!(*actual >= expected && *actual < expected + Duration::from_millis(5));
        }
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(RetryConfig::search());
        let calls = Mutex::new(0);

        let result = policy
            .execute("flaky", || {
                let mut calls = calls.lock().unwrap();
                *calls += 1;
                let n = *calls;
                async move {
                    if n < 3 {
                        Err(GatewayError::Remote("transient".to_string()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_not_retried() {
        let policy = RetryPolicy::new(RetryConfig::search());
        let calls = Mutex::new(0);

        let result: Result<()> = policy
            .execute("precondition", || {
                *calls.lock().unwrap() += 1;
                async { Err(GatewayError::NotInitialized) }
            })
            .await;

        assert!(matches!(result, Err(GatewayError::NotInitialized)));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_none_is_single_attempt() {
        let policy = RetryPolicy::new(RetryConfig::none());
        let calls = Mutex::new(0);

        let result: Result<()> = policy
            .execute("write", || {
                *calls.lock().unwrap() += 1;
                async { Err(GatewayError::Remote("boom".to_string())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
