//! Resilience patterns for talking to a rate-limited remote API
//!
//! - **Rate Limiter**: [`MinIntervalLimiter`] spaces request starts by a
//!   fixed minimum interval
//! - **Retry Logic**: [`RetryExecutor`] runs an operation under a declarative
//!   [`RetryConfig`] + [`RetryPolicy`] pair
//!
//! Both take their notion of time from an injected
//! [`Clock`](crate::time::Clock).

pub mod rate_limiter;
pub mod retry;

// Re-export rate limiter types
pub use rate_limiter::{MinIntervalLimiter, DEFAULT_MIN_INTERVAL};
// Re-export retry types
pub use retry::{
    policies, BackoffStrategy, RetryConfig, RetryDecision, RetryError, RetryExecutor,
    RetryOutcome, RetryPolicy, RetryResult,
};
