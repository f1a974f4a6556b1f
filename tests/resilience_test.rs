use async_trait::async_trait;
use resilient_joke::core::resilience::{
    BulkheadConfig, CircuitBreakerConfig, CircuitState, PolicyConfig, RateLimiterConfig,
    RetryConfig,
};
use resilient_joke::{
    ErrorCategory, FallbackEvent, FallbackReporter, Joke, JokeApi, JokeCategory, JokeError,
    JokeGateway, ResiliencePolicy, ResilientJokeClient, Result,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// 計算網路呼叫次數的假傳輸層
#[derive(Default)]
struct CountingApi {
    calls: AtomicUsize,
    healthy: AtomicBool,
    /// 設定後，呼叫會停在這裡直到被通知
    gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
}

impl CountingApi {
    fn failing() -> Self {
        Self::default()
    }

    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            healthy: AtomicBool::new(true),
            gate: Some(gate),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    async fn call(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(JokeError::UnexpectedStatus {
                status: 503,
                url: "counting".to_string(),
            })
        }
    }
}

#[async_trait]
impl JokeApi for CountingApi {
    async fn get_categories(&self) -> Result<Vec<String>> {
        self.call().await?;
        Ok(vec!["dev".to_string(), "food".to_string()])
    }

    async fn get_joke(&self, category: &JokeCategory) -> Result<Joke> {
        self.call().await?;
        Ok(Joke::new(format!("a {} joke", category), category.clone()))
    }
}

#[derive(Default)]
struct RecordingReporter {
    causes: Mutex<Vec<ErrorCategory>>,
}

impl FallbackReporter for RecordingReporter {
    fn on_fallback(&self, event: &FallbackEvent<'_>) {
        self.causes.lock().unwrap().push(event.cause.category());
    }
}

fn policy(config: PolicyConfig) -> Arc<ResiliencePolicy> {
    Arc::new(ResiliencePolicy::new("jokeService", &config))
}

fn breaker_config(open_ms: u64) -> PolicyConfig {
    PolicyConfig {
        circuit_breaker: CircuitBreakerConfig {
            failure_rate_threshold: 50.0,
            sliding_window_size: 4,
            minimum_number_of_calls: 4,
            wait_duration_in_open_state_ms: open_ms,
            permitted_number_of_calls_in_half_open_state: 2,
            ..CircuitBreakerConfig::default()
        },
        rate_limiter: RateLimiterConfig {
            limit_for_period: 1000,
            ..RateLimiterConfig::default()
        },
        retry: RetryConfig {
            max_attempts: 2,
            wait_duration_ms: 1,
            ..RetryConfig::default()
        },
        ..PolicyConfig::default()
    }
}

#[tokio::test]
async fn test_open_circuit_short_circuits_without_network_calls() {
    let api = Arc::new(CountingApi::failing());
    let reporter = Arc::new(RecordingReporter::default());
    let client = ResilientJokeClient::new(api.clone(), policy(breaker_config(60_000)))
        .with_reporter(reporter.clone());

    // 兩個操作共用同一個斷路器
    client.random_category().await;
    client.joke(&"dev".into()).await;
    client.random_category().await;
    client.joke(&"dev".into()).await;

    assert_eq!(client.policy().circuit_breaker().state(), CircuitState::Open);
    let calls_when_opened = api.calls();
    assert_eq!(calls_when_opened, 8, "4 logical calls x 2 attempts");

    for _ in 0..10 {
        assert_eq!(client.joke(&"food".into()).await, Joke::unavailable());
        assert_eq!(client.random_category().await.as_str(), "dev");
    }

    assert_eq!(api.calls(), calls_when_opened);
    let causes = reporter.causes.lock().unwrap();
    assert_eq!(causes.len(), 24);
    assert!(causes[4..].iter().all(|c| *c == ErrorCategory::CircuitOpen));
    assert_eq!(
        client
            .policy()
            .circuit_breaker()
            .metrics()
            .not_permitted_calls,
        20
    );
}

#[tokio::test]
async fn test_circuit_recovers_through_half_open() {
    let api = Arc::new(CountingApi::failing());
    let client = ResilientJokeClient::new(api.clone(), policy(breaker_config(50)));

    for _ in 0..4 {
        client.joke(&"dev".into()).await;
    }
    assert_eq!(client.policy().circuit_breaker().state(), CircuitState::Open);

    api.set_healthy(true);
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(
        client.policy().circuit_breaker().state(),
        CircuitState::HalfOpen
    );

    let joke = client.joke(&"dev".into()).await;
    assert_eq!(joke.text(), "a dev joke");
    assert_eq!(
        client.policy().circuit_breaker().state(),
        CircuitState::HalfOpen
    );

    client.joke(&"dev".into()).await;
    assert_eq!(client.policy().circuit_breaker().state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_bulkhead_rejects_excess_concurrent_calls() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(CountingApi::gated(gate.clone()));
    let reporter = Arc::new(RecordingReporter::default());
    let config = PolicyConfig {
        bulkhead: BulkheadConfig {
            max_concurrent_calls: 1,
            max_wait_duration_ms: 0,
        },
        ..breaker_config(60_000)
    };
    let client = ResilientJokeClient::new(api.clone(), policy(config))
        .with_reporter(reporter.clone());

    let in_flight = {
        let client = client.clone();
        tokio::spawn(async move { client.joke(&"dev".into()).await })
    };
    api.entered.notified().await;
    assert_eq!(client.policy().bulkhead().available_permits(), 0);

    let started = Instant::now();
    let rejected = client.joke(&"food".into()).await;
    assert!(started.elapsed() < Duration::from_millis(500));
    assert_eq!(rejected, Joke::unavailable());
    assert_eq!(api.calls(), 1);

    gate.notify_one();
    let served = in_flight.await.unwrap();
    assert_eq!(served.text(), "a dev joke");

    assert_eq!(
        reporter.causes.lock().unwrap().as_slice(),
        &[ErrorCategory::Saturation]
    );
    assert_eq!(client.policy().bulkhead().available_permits(), 1);
    assert_eq!(
        client.policy().circuit_breaker().metrics().failed_calls,
        0,
        "bulkhead rejections are not dependency failures"
    );
}

#[tokio::test]
async fn test_cancelled_call_releases_bulkhead_slot() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(CountingApi::gated(gate));
    let config = PolicyConfig {
        bulkhead: BulkheadConfig {
            max_concurrent_calls: 1,
            max_wait_duration_ms: 0,
        },
        ..breaker_config(60_000)
    };
    let client = ResilientJokeClient::new(api.clone(), policy(config));

    let abandoned = tokio::time::timeout(Duration::from_millis(50), client.joke(&"dev".into())).await;
    assert!(abandoned.is_err(), "call should still be parked on the gate");

    assert_eq!(client.policy().bulkhead().available_permits(), 1);
    assert_eq!(client.policy().circuit_breaker().metrics().buffered_calls, 0);
}

#[tokio::test]
async fn test_rate_limited_calls_fall_back_immediately() {
    let api = Arc::new(CountingApi {
        healthy: AtomicBool::new(true),
        ..CountingApi::default()
    });
    let reporter = Arc::new(RecordingReporter::default());
    let config = PolicyConfig {
        rate_limiter: RateLimiterConfig {
            limit_for_period: 2,
            limit_refresh_period_ms: 60_000,
            timeout_duration_ms: 0,
        },
        ..breaker_config(60_000)
    };
    let client = ResilientJokeClient::new(api.clone(), policy(config))
        .with_reporter(reporter.clone());

    assert_eq!(client.joke(&"dev".into()).await.text(), "a dev joke");
    let category = client.random_category().await;
    assert!(["dev", "food"].contains(&category.as_str()));

    assert_eq!(client.joke(&"food".into()).await, Joke::unavailable());
    assert_eq!(client.random_category().await.as_str(), "dev");

    assert_eq!(api.calls(), 2);
    assert_eq!(
        reporter.causes.lock().unwrap().as_slice(),
        &[ErrorCategory::Saturation, ErrorCategory::Saturation]
    );
}

#[tokio::test]
async fn test_retry_backoff_does_not_block_other_calls() {
    let failing = Arc::new(CountingApi::failing());
    let healthy = Arc::new(CountingApi {
        healthy: AtomicBool::new(true),
        ..CountingApi::default()
    });
    let slow_retry = PolicyConfig {
        retry: RetryConfig {
            max_attempts: 2,
            wait_duration_ms: 300,
            ..RetryConfig::default()
        },
        ..breaker_config(60_000)
    };
    let shared = policy(slow_retry);
    let slow_client = ResilientJokeClient::new(failing, shared.clone());
    let fast_client = ResilientJokeClient::new(healthy, shared);

    let backing_off = tokio::spawn(async move { slow_client.joke(&"dev".into()).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = Instant::now();
    let joke = fast_client.joke(&"food".into()).await;
    assert!(started.elapsed() < Duration::from_millis(200));
    assert_eq!(joke.text(), "a food joke");

    assert_eq!(backing_off.await.unwrap(), Joke::unavailable());
}
