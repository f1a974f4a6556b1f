//! Fixed-window rate limiter.
//!
//! `limit_for_period` permits become available at the start of every
//! `limit_refresh_period`. A caller that finds no permit waits for the next
//! period only if that period starts within `timeout_duration`; otherwise it
//! is rejected right away.

use crate::utils::error::{JokeError, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    pub limit_for_period: u32,
    pub limit_refresh_period_ms: u64,
    /// 0 表示不等待，直接拒絕
    pub timeout_duration_ms: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            limit_for_period: 10,
            limit_refresh_period_ms: 1000,
            timeout_duration_ms: 0,
        }
    }
}

impl RateLimiterConfig {
    pub fn limit_refresh_period(&self) -> Duration {
        Duration::from_millis(self.limit_refresh_period_ms.max(1))
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_duration_ms)
    }
}

struct Window {
    started: Instant,
    available: u32,
}

impl Window {
    fn refresh(&mut self, now: Instant, period: Duration, limit: u32) {
        let elapsed = now.duration_since(self.started);
        if elapsed >= period {
            let periods = (elapsed.as_nanos() / period.as_nanos()).min(u32::MAX as u128) as u32;
            self.started += period * periods;
            self.available = limit;
        }
    }
}

pub struct RateLimiter {
    name: String,
    config: RateLimiterConfig,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, config: RateLimiterConfig) -> Self {
        let window = Window {
            started: Instant::now(),
            available: config.limit_for_period,
        };
        Self {
            name: name.into(),
            config,
            window: Mutex::new(window),
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    pub fn available_permits(&self) -> u32 {
        let mut window = self.lock();
        window.refresh(
            Instant::now(),
            self.config.limit_refresh_period(),
            self.config.limit_for_period,
        );
        window.available
    }

    /// 取得一個許可；等不到下一個週期時回傳 `RateLimited`
    pub async fn acquire(&self) -> Result<()> {
        let period = self.config.limit_refresh_period();
        let deadline = Instant::now() + self.config.timeout_duration();

        loop {
            let now = Instant::now();
            let next_refresh = {
                let mut window = self.lock();
                window.refresh(now, period, self.config.limit_for_period);
                if window.available > 0 {
                    window.available -= 1;
                    return Ok(());
                }
                window.started + period
            };

            if next_refresh > deadline {
                tracing::warn!(
                    "🚦 Rate limiter '{}' rejected call: {} permits per {:?} exhausted",
                    self.name,
                    self.config.limit_for_period,
                    period
                );
                return Err(JokeError::RateLimited {
                    name: self.name.clone(),
                });
            }

            tokio::time::sleep(next_refresh.saturating_duration_since(now)).await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish()
    }
}
