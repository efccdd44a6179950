//! Minimum-interval request pacing
//!
//! The remote API enforces roughly one request per second per credential set.
//! [`MinIntervalLimiter`] guarantees that two slots handed out by the same
//! limiter are never closer together than the configured interval. The last
//! slot timestamp is held behind an async mutex for the whole wait, so
//! concurrent callers queue up and are released one interval apart in the
//! order they acquired the lock.
//!
//! State is per limiter instance. Two clients built from different limiters
//! do not pace against each other.

use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use crate::time::{SharedClock, SystemClock};

/// Default spacing between requests (1 request/second)
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(1000);

/// Enforces a minimum spacing between consecutive request starts.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// use rtm_common::resilience::MinIntervalLimiter;
///
/// let limiter = MinIntervalLimiter::new(Duration::from_secs(1));
/// limiter.acquire().await; // returns immediately
/// limiter.acquire().await; // waits ~1s
/// ```
pub struct MinIntervalLimiter {
    min_interval: Duration,
    last_slot: Mutex<Option<Instant>>,
    clock: SharedClock,
}

impl MinIntervalLimiter {
    /// Create a limiter backed by the system clock.
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, SystemClock::shared())
    }

    /// Create a limiter with a custom clock (for testing).
    pub fn with_clock(min_interval: Duration, clock: SharedClock) -> Self {
        Self { min_interval, last_slot: Mutex::new(None), clock }
    }

    /// Configured minimum interval.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a request may start, then record the slot.
    ///
    /// Returns how long the caller was held back.
    pub async fn acquire(&self) -> Duration {
        let mut last_slot = self.last_slot.lock().await;

        let waited = match *last_slot {
            Some(previous) => {
                let elapsed = self.clock.now().saturating_duration_since(previous);
                let remaining = self.min_interval.saturating_sub(elapsed);
                if !remaining.is_zero() {
                    debug!(wait_ms = remaining.as_millis() as u64, "Pacing request");
                    self.clock.sleep(remaining).await;
                }
                remaining
            }
            None => Duration::ZERO,
        };

        *last_slot = Some(self.clock.now());
        waited
    }

    /// Forget the previous slot so the next acquire is immediate.
    pub async fn reset(&self) {
        *self.last_slot.lock().await = None;
    }
}

impl Default for MinIntervalLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl fmt::Debug for MinIntervalLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinIntervalLimiter").field("min_interval", &self.min_interval).finish()
    }
}
