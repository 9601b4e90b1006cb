// src/http/retry.rs
use rand::Rng;
use std::future::Future;
use tokio::time::Duration;

use super::error::{FetchError, FetchErrorType};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_base: f64,
    pub max_jitter: Duration,
    pub max_delay: Duration,
    pub retry_on_errors: Vec<FetchErrorType>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_base: 5.0,
            max_jitter: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            retry_on_errors: vec![
                FetchErrorType::RateLimited,
                FetchErrorType::Transport,
                FetchErrorType::Timeout,
            ],
        }
    }
}

impl RetryConfig {
    /// Policy for the staking endpoints: shorter waits, 5xx retried as well.
    pub fn staking() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_base: 2.0,
            max_jitter: Duration::ZERO,
            max_delay: Duration::from_secs(10),
            retry_on_errors: vec![
                FetchErrorType::RateLimited,
                FetchErrorType::ServerError,
                FetchErrorType::Transport,
                FetchErrorType::Timeout,
            ],
        }
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Delay after the `attempt`-th failure (0-based), jitter excluded.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = self.backoff_base.powi(attempt as i32);
        std::cmp::min(self.base_delay.mul_f64(factor), self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct RetryHandler {
    config: RetryConfig,
}

impl RetryHandler {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub async fn retry<F, Fut, T>(&self, operation: F) -> Result<T, FetchError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    attempt += 1;
                    if !self.should_retry(&error) || attempt >= self.config.max_attempts {
                        return Err(error);
                    }

                    let delay = self.config.backoff_delay(attempt - 1) + self.jitter();
                    log::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt,
                        self.config.max_attempts,
                        error,
                        delay
                    );

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn should_retry(&self, error: &FetchError) -> bool {
        self.config.retry_on_errors.contains(&error.error_type())
    }

    fn jitter(&self) -> Duration {
        if self.config.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        let fraction: f64 = rand::thread_rng().gen_range(0.0..1.0);
        self.config.max_jitter.mul_f64(fraction)
    }
}
