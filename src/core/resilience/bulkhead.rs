//! Semaphore bulkhead limiting concurrent in-flight calls.

use crate::utils::error::{JokeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkheadConfig {
    pub max_concurrent_calls: usize,
    /// 0 表示名額已滿時立即拒絕
    pub max_wait_duration_ms: u64,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: 5,
            max_wait_duration_ms: 0,
        }
    }
}

#[derive(Debug)]
pub struct Bulkhead {
    name: String,
    config: BulkheadConfig,
    semaphore: Semaphore,
}

impl Bulkhead {
    pub fn new(name: impl Into<String>, config: BulkheadConfig) -> Self {
        let semaphore =
            Semaphore::new(config.max_concurrent_calls.clamp(1, Semaphore::MAX_PERMITS));
        Self {
            name: name.into(),
            config,
            semaphore,
        }
    }

    pub fn config(&self) -> &BulkheadConfig {
        &self.config
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// 名額在 permit 被 drop 時歸還（包含呼叫端取消的情況）
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        let permit = if self.config.max_wait_duration_ms == 0 {
            self.semaphore.try_acquire().ok()
        } else {
            let wait = Duration::from_millis(self.config.max_wait_duration_ms);
            tokio::time::timeout(wait, self.semaphore.acquire())
                .await
                .ok()
                .and_then(|acquired| acquired.ok())
        };

        permit.ok_or_else(|| {
            tracing::warn!(
                "🧱 Bulkhead '{}' is full ({} concurrent calls)",
                self.name,
                self.config.max_concurrent_calls
            );
            JokeError::BulkheadFull {
                name: self.name.clone(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulkhead(max: usize, wait_ms: u64) -> Bulkhead {
        Bulkhead::new(
            "test",
            BulkheadConfig {
                max_concurrent_calls: max,
                max_wait_duration_ms: wait_ms,
            },
        )
    }

    #[tokio::test]
    async fn test_rejects_when_full() {
        let bh = bulkhead(1, 0);

        let held = bh.acquire().await.unwrap();
        assert_eq!(bh.available_permits(), 0);
        assert!(matches!(
            bh.acquire().await,
            Err(JokeError::BulkheadFull { .. })
        ));

        drop(held);
        assert_eq!(bh.available_permits(), 1);
        assert!(bh.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_bounded_wait_gets_released_slot() {
        let bh = std::sync::Arc::new(bulkhead(1, 500));
        let held = bh.acquire().await.unwrap();

        let waiter = {
            let bh = bh.clone();
            tokio::spawn(async move { bh.acquire().await.is_ok() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_bounded_wait_times_out() {
        let bh = bulkhead(1, 20);
        let _held = bh.acquire().await.unwrap();

        assert!(bh.acquire().await.is_err());
    }

    #[test]
    fn test_oversized_config_is_clamped() {
        let bh = bulkhead(usize::MAX, 0);
        assert_eq!(bh.available_permits(), Semaphore::MAX_PERMITS);
    }
}
