//! Declarative retry execution
//!
//! A retry is described by three things: how many attempts in total
//! ([`RetryConfig::max_attempts`]), how long to wait between them
//! ([`BackoffStrategy`]), and which failures are worth another attempt
//! ([`RetryPolicy`]). [`RetryExecutor`] combines them and drives an async
//! operation. Waits go through the injected [`Clock`](crate::time::Clock) so
//! that backoff can be observed in tests without sleeping.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::time::{SharedClock, SystemClock};

/// Errors that can occur during retry operations
///
/// Both variants carry the error from the final attempt so callers can
/// surface the real cause rather than a generic "retries exhausted".
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    #[error("All retry attempts exhausted after {attempts} tries")]
    AttemptsExhausted { attempts: u32, last_error: E },

    /// The operation failed with an error the policy refused to retry
    #[error("Operation failed with non-retryable error after {attempts} tries")]
    NonRetryable { attempts: u32, last_error: E },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::AttemptsExhausted { attempts, .. } | Self::NonRetryable { attempts, .. } => {
                *attempts
            }
        }
    }

    /// Consume the retry error and return the final attempt's error.
    pub fn into_last_error(self) -> E {
        match self {
            Self::AttemptsExhausted { last_error, .. } | Self::NonRetryable { last_error, .. } => {
                last_error
            }
        }
    }

    /// Whether the retry budget ran out (as opposed to a non-retryable stop).
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::AttemptsExhausted { .. })
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Outcome of a retry execution including result and summary statistics.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    pub attempts: u32,
    pub total_delay: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Decide whether the failure of attempt `attempt` (0-based) is retried.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation with the configured backoff delay
    Retry,
    /// Don't retry the operation
    Stop,
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Linear backoff: initial_delay + (attempt * increment)
    Linear { initial_delay: Duration, increment: Duration },
}

impl BackoffStrategy {
    /// Delay to wait after the failure of attempt `attempt` (0-based).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Linear { initial_delay, increment } => {
                initial_delay.saturating_add(increment.saturating_mul(attempt))
            }
        }
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts (initial try + retries)
    pub max_attempts: u32,
    /// Backoff strategy for calculating delays
    pub backoff: BackoffStrategy,
}

impl RetryConfig {
    /// Create a config from an attempt count and a backoff strategy.
    pub fn new(max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff }
    }

    /// Linear backoff configuration.
    pub fn linear(max_attempts: u32, initial_delay: Duration, increment: Duration) -> Self {
        Self::new(max_attempts, BackoffStrategy::Linear { initial_delay, increment })
    }
}

/// The main retry executor
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
    clock: SharedClock,
}

impl<P> RetryExecutor<P> {
    /// Create a new retry executor backed by the system clock
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self::with_clock(config, policy, SystemClock::shared())
    }

    /// Create a new retry executor with a custom clock
    pub fn with_clock(config: RetryConfig, policy: P, clock: SharedClock) -> Self {
        Self { config, policy, clock }
    }

    /// Execute an operation with retry logic.
    ///
    /// The closure receives the 0-based attempt number.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Execute an operation with retry logic and return outcome statistics.
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut total_delay = Duration::ZERO;
        let mut attempt = 0;

        loop {
            debug!(attempt = attempt + 1, max_attempts, "Executing operation");

            let error = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "Operation succeeded after retries");
                    }
                    return RetryOutcome { result: Ok(value), attempts: attempt + 1, total_delay };
                }
                Err(error) => error,
            };

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!(error = %error, "Retry policy determined not to retry");
                    return RetryOutcome {
                        result: Err(RetryError::NonRetryable {
                            attempts: attempt + 1,
                            last_error: error,
                        }),
                        attempts: attempt + 1,
                        total_delay,
                    };
                }
                RetryDecision::Retry => self.config.backoff.calculate_delay(attempt),
            };

            if attempt + 1 >= max_attempts {
                warn!(attempts = attempt + 1, error = %error, "All retry attempts exhausted");
                return RetryOutcome {
                    result: Err(RetryError::AttemptsExhausted {
                        attempts: attempt + 1,
                        last_error: error,
                    }),
                    attempts: attempt + 1,
                    total_delay,
                };
            }

            warn!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Operation failed, retrying"
            );
            self.clock.sleep(delay).await;
            total_delay += delay;
            attempt += 1;
        }
    }
}

/// Pre-defined retry policies
pub mod policies {
    use super::{RetryDecision, RetryPolicy};

    /// Predicate-based retry policy
    #[derive(Debug, Clone, Copy)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E) -> bool,
    {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            if (self.predicate)(error) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}
