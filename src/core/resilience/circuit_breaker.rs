//! Circuit breaker, the outermost gate of a policy group.
//!
//! # States
//! - Closed: calls pass through, outcomes go into a sliding window
//! - Open: calls are rejected without touching the network
//! - Half-Open: a limited number of trial calls decide whether to close again
//!
//! # State Transitions
//! ```text
//! Closed    → Open:      failure rate >= threshold (once minimum_number_of_calls recorded)
//! Open      → Half-Open: wait_duration_in_open_state elapsed (checked lazily on next call)
//! Half-Open → Closed:    all trial calls recorded, failure rate < threshold
//! Half-Open → Open:      all trial calls recorded, failure rate >= threshold
//! ```
//!
//! Outcomes recorded against an older state (a permit handed out before a
//! transition) are ignored.

use crate::utils::error::{JokeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlidingWindowType {
    /// 最近 N 次呼叫
    #[default]
    CountBased,
    /// 最近 N 秒內的呼叫
    TimeBased,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// 失敗率門檻（百分比）
    pub failure_rate_threshold: f64,
    pub sliding_window_type: SlidingWindowType,
    pub sliding_window_size: usize,
    pub minimum_number_of_calls: usize,
    pub wait_duration_in_open_state_ms: u64,
    pub permitted_number_of_calls_in_half_open_state: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 50.0,
            sliding_window_type: SlidingWindowType::CountBased,
            sliding_window_size: 10,
            minimum_number_of_calls: 5,
            wait_duration_in_open_state_ms: 10_000,
            permitted_number_of_calls_in_half_open_state: 3,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn wait_duration_in_open_state(&self) -> Duration {
        Duration::from_millis(self.wait_duration_in_open_state_ms)
    }

    fn minimum_calls(&self) -> usize {
        let minimum = self.minimum_number_of_calls.max(1);
        match self.sliding_window_type {
            SlidingWindowType::CountBased => minimum.min(self.sliding_window_size.max(1)),
            SlidingWindowType::TimeBased => minimum,
        }
    }

    /// 非有限值時退回預設門檻，否則斷路器永遠不會開啟
    fn threshold(&self) -> f64 {
        if self.failure_rate_threshold.is_finite() {
            self.failure_rate_threshold
        } else {
            Self::default().failure_rate_threshold
        }
    }

    fn trial_calls(&self) -> usize {
        self.permitted_number_of_calls_in_half_open_state.max(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    /// 尚未達到 minimum_number_of_calls 時為 None
    pub failure_rate: Option<f64>,
    pub buffered_calls: usize,
    pub failed_calls: usize,
    pub not_permitted_calls: u64,
}

struct SlidingWindow {
    kind: SlidingWindowType,
    size: usize,
    outcomes: VecDeque<(Instant, bool)>,
}

impl SlidingWindow {
    fn new(kind: SlidingWindowType, size: usize) -> Self {
        Self {
            kind,
            size: size.max(1),
            outcomes: VecDeque::new(),
        }
    }

    fn record(&mut self, now: Instant, failed: bool) {
        self.outcomes.push_back((now, failed));
        self.evict(now);
    }

    fn evict(&mut self, now: Instant) {
        match self.kind {
            SlidingWindowType::CountBased => {
                while self.outcomes.len() > self.size {
                    self.outcomes.pop_front();
                }
            }
            SlidingWindowType::TimeBased => {
                let span = Duration::from_secs(self.size as u64);
                while let Some(&(at, _)) = self.outcomes.front() {
                    if now.duration_since(at) >= span {
                        self.outcomes.pop_front();
                    } else {
                        break;
                    }
                }
            }
        }
    }

    /// (總數, 失敗數)
    fn counts(&mut self, now: Instant) -> (usize, usize) {
        self.evict(now);
        let failed = self.outcomes.iter().filter(|(_, failed)| *failed).count();
        (self.outcomes.len(), failed)
    }

    fn clear(&mut self) {
        self.outcomes.clear();
    }
}

enum Phase {
    Closed,
    Open {
        since: Instant,
    },
    HalfOpen {
        in_flight: usize,
        successes: usize,
        failures: usize,
    },
}

impl Phase {
    fn state(&self) -> CircuitState {
        match self {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

struct Inner {
    phase: Phase,
    generation: u64,
    window: SlidingWindow,
    not_permitted: u64,
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let window = SlidingWindow::new(config.sliding_window_type, config.sliding_window_size);
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                phase: Phase::Closed,
                generation: 0,
                window,
                not_permitted: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.refresh(&mut inner, Instant::now());
        inner.phase.state()
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let now = Instant::now();
        let mut inner = self.lock();
        self.refresh(&mut inner, now);
        let (total, failed) = inner.window.counts(now);
        let failure_rate = if total >= self.config.minimum_calls() {
            Some(failure_rate(total, failed))
        } else {
            None
        };

        CircuitBreakerMetrics {
            state: inner.phase.state(),
            failure_rate,
            buffered_calls: total,
            failed_calls: failed,
            not_permitted_calls: inner.not_permitted,
        }
    }

    /// 取得呼叫許可；斷路器開啟或半開名額已滿時回傳 `CircuitOpen`
    pub fn try_acquire(&self) -> Result<CircuitPermit<'_>> {
        let mut inner = self.lock();
        self.refresh(&mut inner, Instant::now());

        let trial_calls = self.config.trial_calls();
        let permitted = match &mut inner.phase {
            Phase::Closed => true,
            Phase::Open { .. } => false,
            Phase::HalfOpen {
                in_flight,
                successes,
                failures,
            } => {
                if *in_flight + *successes + *failures < trial_calls {
                    *in_flight += 1;
                    true
                } else {
                    false
                }
            }
        };

        if !permitted {
            inner.not_permitted += 1;
            tracing::debug!(
                "🔌 Circuit breaker '{}' is {:?}, rejecting call",
                self.name,
                inner.phase.state()
            );
            return Err(JokeError::CircuitOpen {
                name: self.name.clone(),
            });
        }

        Ok(CircuitPermit {
            breaker: self,
            generation: inner.generation,
            settled: false,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open 狀態等待時間到期後轉為 Half-Open
    fn refresh(&self, inner: &mut Inner, now: Instant) {
        if let Phase::Open { since } = inner.phase {
            if now.duration_since(since) >= self.config.wait_duration_in_open_state() {
                self.transition(
                    inner,
                    Phase::HalfOpen {
                        in_flight: 0,
                        successes: 0,
                        failures: 0,
                    },
                );
            }
        }
    }

    fn transition(&self, inner: &mut Inner, to: Phase) {
        let from = inner.phase.state();
        let to_state = to.state();
        if matches!(to, Phase::Closed) {
            inner.window.clear();
        }
        inner.phase = to;
        inner.generation += 1;

        match to_state {
            CircuitState::Open => tracing::warn!(
                "🔌 Circuit breaker '{}' {:?} -> {:?}",
                self.name,
                from,
                to_state
            ),
            _ => tracing::info!(
                "🔌 Circuit breaker '{}' {:?} -> {:?}",
                self.name,
                from,
                to_state
            ),
        }
    }

    fn on_result(&self, generation: u64, failed: bool) {
        let now = Instant::now();
        let mut guard = self.lock();
        let inner = &mut *guard;
        if inner.generation != generation {
            return;
        }

        let threshold = self.config.threshold();
        let trial_calls = self.config.trial_calls();

        match &mut inner.phase {
            Phase::Closed => {
                inner.window.record(now, failed);
                let (total, failures) = inner.window.counts(now);
                if total >= self.config.minimum_calls() {
                    let rate = failure_rate(total, failures);
                    if rate >= threshold {
                        tracing::warn!(
                            "🔌 Circuit breaker '{}' failure rate {:.1}% >= {:.1}% ({} of {} calls)",
                            self.name,
                            rate,
                            threshold,
                            failures,
                            total
                        );
                        self.transition(inner, Phase::Open { since: now });
                    }
                }
            }
            Phase::HalfOpen {
                in_flight,
                successes,
                failures,
            } => {
                *in_flight = in_flight.saturating_sub(1);
                if failed {
                    *failures += 1;
                } else {
                    *successes += 1;
                }

                let recorded = *successes + *failures;
                if recorded >= trial_calls {
                    let rate = failure_rate(recorded, *failures);
                    let next = if rate >= threshold {
                        Phase::Open { since: now }
                    } else {
                        Phase::Closed
                    };
                    self.transition(inner, next);
                }
            }
            Phase::Open { .. } => {}
        }
    }

    fn release(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        if let Phase::HalfOpen { in_flight, .. } = &mut inner.phase {
            *in_flight = in_flight.saturating_sub(1);
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

fn failure_rate(total: usize, failed: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        failed as f64 * 100.0 / total as f64
    }
}

/// 一次呼叫的許可；未記錄結果就被 drop 時會歸還半開名額
#[must_use]
pub struct CircuitPermit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl CircuitPermit<'_> {
    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_result(self.generation, false);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_result(self.generation, true);
    }
}

impl Drop for CircuitPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release(self.generation);
        }
    }
}
