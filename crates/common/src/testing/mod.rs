//! Testing utilities and helpers
//!
//! - **[`time`]**: deterministic clock for pacing, backoff and TTL tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::time::Duration;
//!
//! use rtm_common::testing::MockClock;
//! use rtm_common::time::Clock;
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.now().duration_since(start), Duration::from_secs(5));
//! ```

pub mod time;

pub use time::MockClock;
