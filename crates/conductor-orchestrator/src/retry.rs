//! Retry policy and executor for stage attempts.
//!
//! One policy governs every stage of a run. The delay between attempts is either
//! fixed or exponential (doubling from the base delay, capped at `max_delay_ms`).

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayStrategy {
    /// Always wait `retry_delay_ms`.
    #[default]
    Fixed,
    /// Wait `retry_delay_ms * 2^retry`, capped at `max_delay_ms`.
    Exponential,
}

/// Retry policy applied to every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Base delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
    /// Delay growth strategy.
    pub strategy: DelayStrategy,
    /// Upper bound for exponential delays in milliseconds.
    pub max_delay_ms: u64,
    /// When false, a failed attempt is never retried.
    pub retry_on_failure: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay_ms: 1_000,
            strategy: DelayStrategy::Fixed,
            max_delay_ms: 10_000,
            retry_on_failure: true,
        }
    }
}

impl RetryPolicy {
    /// Creates a fixed-delay policy.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay_ms: delay.as_millis() as u64,
            strategy: DelayStrategy::Fixed,
            ..Self::default()
        }
    }

    /// Creates an exponential-backoff policy.
    pub fn exponential(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay_ms: base_delay.as_millis() as u64,
            strategy: DelayStrategy::Exponential,
            max_delay_ms: max_delay.as_millis() as u64,
            retry_on_failure: true,
        }
    }

    /// Creates a policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self { retry_on_failure: false, ..Self::default() }
    }

    /// Retries actually allowed, taking `retry_on_failure` into account.
    pub fn effective_max_retries(&self) -> u32 {
        if self.retry_on_failure { self.max_retries } else { 0 }
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.effective_max_retries().saturating_add(1)
    }

    /// Calculate the delay before retry number `retry` (0 for the first retry).
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let delay_ms = match self.strategy {
            DelayStrategy::Fixed => self.retry_delay_ms,
            DelayStrategy::Exponential => {
                let factor = 2u64.checked_pow(retry).unwrap_or(u64::MAX);
                self.retry_delay_ms.saturating_mul(factor).min(self.max_delay_ms)
            }
        };
        Duration::from_millis(delay_ms)
    }
}

/// Errors that know whether another attempt could help.
pub trait RetryableError {
    /// Returns false for errors that must end the retry loop immediately.
    fn is_retryable(&self) -> bool;
}

/// Successful outcome of a retried operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySuccess<T> {
    /// Value returned by the successful attempt.
    pub value: T,
    /// Retries used before the success (attempts minus one).
    pub retries: u32,
}

/// Terminal outcome of a retried operation that never succeeded.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The last attempt failed and no retry remains, or the error was not retryable.
    Failed {
        /// Error from the last attempt.
        error: E,
        /// Attempts made, including the first.
        attempts: u32,
    },
    /// The cancellation token fired while waiting for the next attempt.
    Cancelled {
        /// Error from the last attempt before cancellation.
        last_error: E,
        /// Attempts made, including the first.
        attempts: u32,
    },
}

impl<E> RetryError<E> {
    /// Attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Failed { attempts, .. } | RetryError::Cancelled { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Re-invokes a fallible async operation according to a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    /// Policy controlling attempts and delays.
    policy: RetryPolicy,
    /// Token interrupting the delay between attempts.
    cancel: Option<CancellationToken>,
}

impl RetryExecutor {
    /// Creates a retry executor.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, cancel: None }
    }

    /// Interrupts retry delays when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Executes `operation` until it succeeds or the policy is exhausted.
    ///
    /// `operation` receives the 1-based attempt number. `on_retry` is called
    /// before each delay with the number of retries scheduled so far and the
    /// error that caused the retry.
    pub async fn execute_with_retry<T, E, F, Fut, R>(
        &self,
        label: &str,
        mut operation: F,
        mut on_retry: R,
    ) -> Result<RetrySuccess<T>, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + Display,
        R: FnMut(u32, &E),
    {
        let max_retries = self.policy.effective_max_retries();
        let mut retries = 0u32;

        loop {
            let attempt = retries.saturating_add(1);
            let error = match operation(attempt).await {
                Ok(value) => {
                    if retries > 0 {
                        debug!(label = %label, attempt, retries, "Operation succeeded after retry");
                    }
                    return Ok(RetrySuccess { value, retries });
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                debug!(label = %label, attempt, error = %error, "Error is not retryable");
                return Err(RetryError::Failed { error, attempts: attempt });
            }

            if retries >= max_retries {
                warn!(
                    label = %label,
                    attempts = attempt,
                    error = %error,
                    "Retries exhausted"
                );
                return Err(RetryError::Failed { error, attempts: attempt });
            }

            let delay = self.policy.calculate_delay(retries);
            warn!(
                label = %label,
                attempt,
                max_attempts = self.policy.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed, retrying after delay"
            );

            retries += 1;
            on_retry(retries, &error);

            match &self.cancel {
                Some(token) => {
                    tokio::select! {
                        () = token.cancelled() => {
                            warn!(label = %label, attempts = attempt, "Retry delay interrupted by cancellation");
                            return Err(RetryError::Cancelled { last_error: error, attempts: attempt });
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
        }
    }
}
