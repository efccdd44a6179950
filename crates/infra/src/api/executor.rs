//! Request executor
//!
//! One signed URL in, one successful envelope out. Each network attempt
//! takes a rate-limiter slot first and runs under a deadline that covers
//! both the response head and the body. HTTP 503 is the only status that is
//! retried here; timeouts are surfaced on the first occurrence regardless of
//! HTTP method, because a mutation that timed out may already have been
//! applied.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use rtm_common::resilience::policies::PredicateRetry;
use rtm_common::resilience::{BackoffStrategy, MinIntervalLimiter, RetryConfig, RetryExecutor};
use rtm_common::time::SharedClock;
use rtm_domain::{Envelope, Response, Result, RtmError};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::http::HttpClient;

/// Backoff after a 503: `(attempt + 2)` seconds, attempt being 0-based.
pub fn rate_limit_backoff() -> BackoffStrategy {
    BackoffStrategy::Linear {
        initial_delay: Duration::from_secs(2),
        increment: Duration::from_secs(1),
    }
}

fn is_rate_limited(error: &RtmError) -> bool {
    matches!(error, RtmError::RateLimited { .. })
}

/// Executes signed requests against the REST endpoint
#[derive(Clone)]
pub struct RequestExecutor {
    http: HttpClient,
    limiter: Arc<MinIntervalLimiter>,
    clock: SharedClock,
    timeout: Duration,
    retry: RetryConfig,
}

impl RequestExecutor {
    /// `max_retries` counts retries after the first attempt.
    pub fn new(
        http: HttpClient,
        limiter: Arc<MinIntervalLimiter>,
        clock: SharedClock,
        timeout: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            http,
            limiter,
            clock,
            timeout,
            retry: RetryConfig::new(max_retries.saturating_add(1), rate_limit_backoff()),
        }
    }

    /// Execute with the default deadline.
    pub async fn execute(&self, method: Method, url: &Url) -> Result<Response> {
        self.execute_with_timeout(method, url, self.timeout).await
    }

    /// Execute with a per-attempt deadline of `timeout`.
    ///
    /// # Errors
    ///
    /// - `RtmError::Timeout` when an attempt exceeds `timeout`
    /// - `RtmError::RateLimited` when every attempt answered 503
    /// - `RtmError::Http` for any other non-2xx status
    /// - `RtmError::Api` when the envelope reports `fail`
    #[instrument(skip_all, fields(http_method = %method, rtm_method = %rtm_method(url)))]
    pub async fn execute_with_timeout(
        &self,
        method: Method,
        url: &Url,
        timeout: Duration,
    ) -> Result<Response> {
        let executor = RetryExecutor::with_clock(
            self.retry.clone(),
            PredicateRetry::new(is_rate_limited),
            self.clock.clone(),
        );

        let outcome = executor
            .execute_with_outcome(|attempt| self.attempt(method.clone(), url, timeout, attempt))
            .await;

        match outcome.result {
            Ok(response) => {
                debug!(attempts = outcome.attempts, "Request completed");
                Ok(response)
            }
            Err(err) => {
                let err = err.into_last_error();
                warn!(attempts = outcome.attempts, error = err.label(), "Request failed");
                Err(err)
            }
        }
    }

    async fn attempt(
        &self,
        method: Method,
        url: &Url,
        timeout: Duration,
        attempt: u32,
    ) -> Result<Response> {
        let waited = self.limiter.acquire().await;
        debug!(attempt = attempt + 1, waited_ms = waited.as_millis() as u64, "Sending request");

        let exchange = async {
            let response = self.http.send(self.http.request(method, url.clone())).await?;
            let status = response.status();
            if status == StatusCode::SERVICE_UNAVAILABLE {
                return Err(RtmError::RateLimited { attempts: attempt + 1 });
            }
            if !status.is_success() {
                return Err(RtmError::Http { status: status.as_u16() });
            }
            response.text().await.map_err(|err| {
                RtmError::InvalidResponse(format!("failed to read response body: {err}"))
            })
        };

        let body = match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Request timed out");
                return Err(RtmError::Timeout { timeout });
            }
        };

        Envelope::parse(&body)?.rsp.into_result()
    }
}

// Only the remote method name is logged; the query also carries the token
// and signature.
fn rtm_method(url: &Url) -> String {
    url.query_pairs()
        .find(|(key, _)| key == "method")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}
