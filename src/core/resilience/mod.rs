//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to the joke API:
//!     → circuit_breaker.rs (fail fast while open)
//!     → rate_limiter.rs    (permits per refresh period)
//!     → bulkhead.rs        (concurrent in-flight cap)
//!     → retry.rs           (transient failures, backoff.rs for delays)
//!     → transport
//! ```
//!
//! Rejections from the first three layers never reach the network and are
//! never retried. `policy.rs` composes the layers into a named group shared
//! by every operation that uses the same name.

pub mod backoff;
pub mod bulkhead;
pub mod circuit_breaker;
pub mod policy;
pub mod rate_limiter;
pub mod retry;

pub use backoff::BackoffStrategy;
pub use bulkhead::{Bulkhead, BulkheadConfig};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState, SlidingWindowType,
};
pub use policy::{PolicyConfig, PolicyRegistry, ResiliencePolicy, DEFAULT_POLICY_NAME};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use retry::{Retry, RetryConfig};
