//! Shared runtime utilities for the RTM client crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `runtime`: clock abstraction, request pacing and retry execution
//! - `test-utils`: deterministic [`testing::MockClock`] for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;
#[cfg(feature = "runtime")]
pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(all(feature = "runtime", any(feature = "test-utils", test)))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use resilience::{
    BackoffStrategy, MinIntervalLimiter, RetryConfig, RetryDecision, RetryError, RetryExecutor,
    RetryOutcome, RetryPolicy,
};
#[cfg(feature = "runtime")]
pub use time::{Clock, SharedClock, SystemClock};
