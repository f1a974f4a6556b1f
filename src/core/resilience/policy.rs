use super::bulkhead::{Bulkhead, BulkheadConfig};
use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use super::rate_limiter::{RateLimiter, RateLimiterConfig};
use super::retry::{Retry, RetryConfig};
use crate::utils::error::{JokeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

pub const DEFAULT_POLICY_NAME: &str = "jokeService";

/// 一個具名 policy group 的設定，對應 TOML 中的 `[resilience.<name>]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub circuit_breaker: CircuitBreakerConfig,
    pub rate_limiter: RateLimiterConfig,
    pub bulkhead: BulkheadConfig,
    pub retry: RetryConfig,
}

/// 斷路器 → 速率限制 → bulkhead → retry → 實際呼叫
///
/// 同一個 policy 的所有操作共用計數與狀態。
#[derive(Debug)]
pub struct ResiliencePolicy {
    name: String,
    circuit_breaker: CircuitBreaker,
    rate_limiter: RateLimiter,
    bulkhead: Bulkhead,
    retry: Retry,
}

impl ResiliencePolicy {
    pub fn new(name: impl Into<String>, config: &PolicyConfig) -> Self {
        let name = name.into();
        Self {
            circuit_breaker: CircuitBreaker::new(name.clone(), config.circuit_breaker.clone()),
            rate_limiter: RateLimiter::new(name.clone(), config.rate_limiter.clone()),
            bulkhead: Bulkhead::new(name.clone(), config.bulkhead.clone()),
            retry: Retry::new(name.clone(), config.retry.clone()),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn bulkhead(&self) -> &Bulkhead {
        &self.bulkhead
    }

    pub fn retry(&self) -> &Retry {
        &self.retry
    }

    pub async fn execute<T, F, Fut>(&self, operation: &str, call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // 被速率限制或 bulkhead 拒絕時 permit 直接 drop，不算失敗
        let permit = self.circuit_breaker.try_acquire()?;
        self.rate_limiter.acquire().await?;
        let _slot = self.bulkhead.acquire().await?;

        tracing::debug!("⚙️ {}: executing {}", self.name, operation);
        match self.retry.execute(operation, call).await {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(e) => {
                permit.record_failure();
                Err(e)
            }
        }
    }

    /// 與 `execute` 相同，但任何錯誤都交給 `fallback` 轉成預設值
    pub async fn execute_or_else<T, F, Fut, G>(&self, operation: &str, call: F, fallback: G) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        G: FnOnce(JokeError) -> T,
    {
        match self.execute(operation, call).await {
            Ok(value) => value,
            Err(e) => fallback(e),
        }
    }
}

/// 依名稱共享 policy group；設定中沒有的名稱使用預設值
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    configs: HashMap<String, PolicyConfig>,
    policies: Mutex<HashMap<String, Arc<ResiliencePolicy>>>,
}

impl PolicyRegistry {
    pub fn new(configs: HashMap<String, PolicyConfig>) -> Self {
        Self {
            configs,
            policies: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self, name: &str) -> Arc<ResiliencePolicy> {
        let mut policies = self
            .policies
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        policies
            .entry(name.to_string())
            .or_insert_with(|| {
                let config = self.configs.get(name).cloned().unwrap_or_else(|| {
                    tracing::debug!("No configuration for policy '{}', using defaults", name);
                    PolicyConfig::default()
                });
                Arc::new(ResiliencePolicy::new(name, &config))
            })
            .clone()
    }
}
