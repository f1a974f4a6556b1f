//! Retry 之間的等待時間計算。

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    #[default]
    Fixed,
    Exponential,
}

/// 第 `retry` 次重試前的等待時間（從 1 開始）
pub fn calculate_backoff(
    strategy: BackoffStrategy,
    retry: u32,
    base: Duration,
    multiplier: f64,
    max: Duration,
) -> Duration {
    if retry == 0 {
        return Duration::ZERO;
    }

    let delay = match strategy {
        BackoffStrategy::Fixed => base,
        BackoffStrategy::Exponential => {
            let factor = multiplier.max(1.0).powi(retry.saturating_sub(1) as i32);
            let millis = (base.as_millis() as f64 * factor).min(u64::MAX as f64);
            Duration::from_millis(millis as u64)
        }
    };

    if strategy == BackoffStrategy::Exponential {
        delay.min(max)
    } else {
        delay
    }
}

/// 在 [delay * (1 - factor), delay * (1 + factor)] 之間隨機取值
pub fn apply_jitter(delay: Duration, randomization_factor: f64) -> Duration {
    if !randomization_factor.is_finite() {
        return delay;
    }
    let factor = randomization_factor.clamp(0.0, 1.0);
    if factor == 0.0 || delay.is_zero() {
        return delay;
    }

    let millis = delay.as_millis() as f64;
    let low = millis * (1.0 - factor);
    let high = millis * (1.0 + factor);
    let jittered = rand::thread_rng().gen_range(low..=high);

    Duration::from_millis(jittered.round() as u64)
}
