//! Time abstraction for testability
//!
//! Everything in the client that waits or measures elapsed time goes through
//! [`Clock`]: the request pacer, retry backoff and the timeline TTL check.
//! Production code uses [`SystemClock`]; tests inject
//! [`MockClock`](crate::testing::MockClock) so that a one-second pacing
//! interval or a thirty-minute TTL can be exercised without real waiting.
//!
//! # Examples
//!
//! ```
//! use rtm_common::time::{Clock, SystemClock};
//!
//! let clock = SystemClock;
//! let now = clock.now();
//! assert!(clock.now() >= now);
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Trait for time operations to enable testing
///
/// `sleep` is part of the abstraction (not just `now`) so that a mock clock
/// can turn waits into instantaneous virtual-time advances.
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Shared, type-erased clock handle passed between client components.
pub type SharedClock = Arc<dyn Clock>;

/// Real system clock backed by `std::time` and `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Convenience constructor returning a [`SharedClock`].
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[async_trait]
impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock;
        let now1 = clock.now();
        let now2 = clock.now();

        assert!(now2 >= now1);
    }

    #[tokio::test]
    async fn test_system_clock_sleep_waits() {
        let clock = SystemClock;
        let start = clock.now();

        clock.sleep(Duration::from_millis(20)).await;

        assert!(clock.now().duration_since(start) >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_zero_sleep_returns_immediately() {
        let clock = SystemClock::shared();
        let start = clock.now();

        clock.sleep(Duration::ZERO).await;

        assert!(clock.now().duration_since(start) < Duration::from_millis(50));
    }
}
