//! Timeline cache
//!
//! Mutating calls need a timeline handle. Handles are kept per auth token
//! for a fixed TTL and checked lazily on access. The entry map stays locked
//! while a handle is being created, so concurrent callers for the same
//! client wait for one creation instead of racing several.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use rtm_common::resilience::policies::PredicateRetry;
use rtm_common::resilience::{RetryConfig, RetryExecutor};
use rtm_common::time::SharedClock;
use rtm_domain::constants::{TIMELINE_BACKOFF_STEP, TIMELINE_MAX_ATTEMPTS, TIMELINE_TTL};
use rtm_domain::{Result, RtmError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Timeline cache configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineCacheConfig {
    /// How long a handle is reused
    pub ttl: Duration,
    /// Attempt budget and backoff for creating a handle
    pub retry: RetryConfig,
}

impl Default for TimelineCacheConfig {
    fn default() -> Self {
        Self {
            ttl: TIMELINE_TTL,
            retry: RetryConfig::linear(
                TIMELINE_MAX_ATTEMPTS,
                TIMELINE_BACKOFF_STEP,
                TIMELINE_BACKOFF_STEP,
            ),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedTimeline {
    timeline: String,
    obtained_at: Instant,
}

/// Per-token timeline handles with TTL
pub struct TimelineCache {
    config: TimelineCacheConfig,
    clock: SharedClock,
    entries: Mutex<HashMap<String, CachedTimeline>>,
}

impl TimelineCache {
    pub fn new(config: TimelineCacheConfig, clock: SharedClock) -> Self {
        Self { config, clock, entries: Mutex::new(HashMap::new()) }
    }

    pub fn config(&self) -> &TimelineCacheConfig {
        &self.config
    }

    /// Return the cached handle for `token`, or obtain one through `create`.
    ///
    /// `create` is retried on transport failures (timeouts, connection
    /// errors) within the configured budget; anything else stops at once.
    ///
    /// # Errors
    ///
    /// Returns `RtmError::TimelineCreation` wrapping the final failure.
    pub async fn get_or_create<F, Fut>(&self, token: &str, mut create: F) -> Result<String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let mut entries = self.entries.lock().await;
        let now = self.clock.now();

        if let Some(entry) = entries.get(token) {
            let age = now.saturating_duration_since(entry.obtained_at);
            if age < self.config.ttl {
                debug!(age_secs = age.as_secs(), "Timeline cache hit");
                return Ok(entry.timeline.clone());
            }
            debug!(age_secs = age.as_secs(), "Timeline expired");
        } else {
            debug!("Timeline cache miss");
        }

        let executor = RetryExecutor::with_clock(
            self.config.retry.clone(),
            PredicateRetry::new(RtmError::is_transient),
            self.clock.clone(),
        );
        let outcome = executor.execute_with_outcome(|_| create()).await;

        match outcome.result {
            Ok(timeline) => {
                info!(attempts = outcome.attempts, "Timeline created");
                entries.insert(
                    token.to_string(),
                    CachedTimeline { timeline: timeline.clone(), obtained_at: self.clock.now() },
                );
                Ok(timeline)
            }
            Err(err) => {
                let attempts = err.attempts();
                let reason = err.into_last_error().to_string();
                warn!(attempts, reason = %reason, "Timeline creation failed");
                entries.remove(token);
                Err(RtmError::TimelineCreation { attempts, reason })
            }
        }
    }

    /// Drop the handle for `token` so the next call creates a new one.
    pub async fn invalidate(&self, token: &str) {
        if self.entries.lock().await.remove(token).is_some() {
            debug!("Timeline invalidated");
        }
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use rtm_common::testing::MockClock;

    use super::*;

    fn cache(clock: &MockClock) -> TimelineCache {
        TimelineCache::new(TimelineCacheConfig::default(), Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn test_reuses_handle_within_ttl() {
        let clock = MockClock::new();
        let cache = cache(&clock);
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let create = || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("timeline-{n}"))
        };

        assert_eq!(cache.get_or_create("tok", create).await.unwrap(), "timeline-1");
        clock.advance(Duration::from_secs(29 * 60));
        assert_eq!(cache.get_or_create("tok", create).await.unwrap(), "timeline-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(2 * 60));
        assert_eq!(cache.get_or_create("tok", create).await.unwrap(), "timeline-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_handles_are_keyed_by_token() {
        let clock = MockClock::new();
        let cache = cache(&clock);

        let a = cache.get_or_create("a", || async { Ok("t-a".to_string()) }).await.unwrap();
        let b = cache.get_or_create("b", || async { Ok("t-b".to_string()) }).await.unwrap();

        assert_eq!((a.as_str(), b.as_str()), ("t-a", "t-b"));
    }

    #[tokio::test]
    async fn test_transient_failures_retry_with_linear_backoff() {
        let clock = MockClock::new();
        let cache = cache(&clock);
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let timeline = cache
            .get_or_create("tok", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RtmError::Timeout { timeout: Duration::from_secs(10) })
                } else {
                    Ok("t".to_string())
                }
            })
            .await
            .unwrap();

        assert_eq!(timeline, "t");
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_exhausted_budget_is_timeline_creation_error() {
        let clock = MockClock::new();
        let cache = cache(&clock);
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = cache
            .get_or_create("tok", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RtmError::Network("connection reset".into()))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(
            matches!(err, RtmError::TimelineCreation { attempts: 3, ref reason } if reason.contains("connection reset"))
        );
    }

    #[tokio::test]
    async fn test_api_failure_is_not_retried() {
        let clock = MockClock::new();
        let cache = cache(&clock);
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = cache
            .get_or_create("tok", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RtmError::Api { code: "98".into(), message: "Invalid auth token".into() })
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, RtmError::TimelineCreation { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_handle() {
        let clock = MockClock::new();
        let cache = cache(&clock);
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let create = || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("timeline-{n}"))
        };

        cache.get_or_create("tok", create).await.unwrap();
        cache.invalidate("tok").await;
        assert_eq!(cache.get_or_create("tok", create).await.unwrap(), "timeline-2");
    }
}
