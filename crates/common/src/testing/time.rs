//! Mock clock for deterministic tests
//!
//! [`MockClock`] never blocks: `sleep` advances virtual time by the requested
//! duration and records it, so tests can assert both the total time that
//! "passed" and the exact sequence of waits (pacing gaps, backoff delays).

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::time::Clock;

/// Mock clock for deterministic testing
///
/// # Examples
///
/// ```ignore
/// use std::time::Duration;
///
/// use rtm_common::testing::MockClock;
/// use rtm_common::time::Clock;
///
/// let clock = MockClock::new();
/// let start = clock.now();
///
/// // Simulate 5 seconds passing
/// clock.advance(Duration::from_secs(5));
///
/// assert_eq!(clock.now().duration_since(start), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl MockClock {
    /// Create a new mock clock
    ///
    /// The clock starts at the current real instant but only moves when
    /// advanced or slept on.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Advance the mock clock by a duration without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Get the virtual time elapsed since creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }

    /// Every duration passed to [`Clock::sleep`], in call order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Sum of all recorded sleeps.
    #[must_use]
    pub fn total_slept(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        self.advance(duration);
    }
}
