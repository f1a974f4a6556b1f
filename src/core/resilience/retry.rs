//! Retry layer, innermost in the policy stack.
//!
//! Only transient and mapping failures are retried. The delay between
//! attempts is an async sleep, so other tasks keep running.

use super::backoff::{apply_jitter, calculate_backoff, BackoffStrategy};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// 包含第一次呼叫
    pub max_attempts: u32,
    pub wait_duration_ms: u64,
    pub backoff: BackoffStrategy,
    pub multiplier: f64,
    pub max_wait_duration_ms: u64,
    pub randomization_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            wait_duration_ms: 500,
            backoff: BackoffStrategy::Fixed,
            multiplier: 2.0,
            max_wait_duration_ms: 5000,
            randomization_factor: 0.0,
        }
    }
}

impl RetryConfig {
    pub fn delay_for(&self, retry: u32) -> Duration {
        let delay = calculate_backoff(
            self.backoff,
            retry,
            Duration::from_millis(self.wait_duration_ms),
            self.multiplier,
            Duration::from_millis(self.max_wait_duration_ms),
        );
        apply_jitter(delay, self.randomization_factor)
    }
}

#[derive(Debug)]
pub struct Retry {
    name: String,
    config: RetryConfig,
}

impl Retry {
    pub fn new(name: impl Into<String>, config: RetryConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub async fn execute<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(
                            "🔁 {}: {} succeeded on attempt {}/{}",
                            self.name,
                            operation,
                            attempt,
                            max_attempts
                        );
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.delay_for(attempt);
                    tracing::warn!(
                        "🔁 {}: {} attempt {}/{} failed: {}. Retrying in {:?}",
                        self.name,
                        operation,
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() && max_attempts > 1 {
                        tracing::warn!(
                            "🔁 {}: {} gave up after {} attempts: {}",
                            self.name,
                            operation,
                            attempt,
                            e
                        );
                    }
                    return Err(e);
                }
            }
        }
    }
}
