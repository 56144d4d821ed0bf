//! Bounded retry with exponential backoff for provider calls.
//!
//! Each call walks an explicit state machine:
//!
//! ```text
//! Attempting(n) --ok-------------> Success
//! Attempting(n) --err, n < max---> Retrying(n) --sleep--> Attempting(n+1)
//! Attempting(n) --err, n == max--> Exhausted
//! ```
//!
//! Every error is retried until the attempt budget runs out. Each attempt is
//! bounded by the policy's timeout; an elapsed timeout becomes
//! `AIError::Timeout`. A rate-limit reply's `retry_after_secs` raises the
//! wait before the next attempt.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::ports::AIError;

/// Backoff is capped at this many units.
const MAX_BACKOFF_UNITS: u32 = 10;

/// How many attempts to make and how long to wait between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    attempt_timeout: Duration,
    backoff_unit: Duration,
}

impl RetryPolicy {
    /// Creates a policy with a one-second backoff unit.
    ///
    /// `max_attempts` is raised to 1 if zero.
    pub fn new(max_attempts: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempt_timeout,
            backoff_unit: Duration::from_secs(1),
        }
    }

    /// Sets the duration of one backoff unit.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Wait after the given failed attempt (1-based): `min(2^(n-1), 10)` units.
    pub fn backoff_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(31);
        let units = 2u32.saturating_pow(exponent).min(MAX_BACKOFF_UNITS);
        self.backoff_unit * units
    }

    /// Wait before retrying a failed attempt: the backoff, or the provider's
    /// `Retry-After` hint if that is longer.
    pub fn delay_after(&self, failed_attempt: u32, error: &AIError) -> Duration {
        let backoff = self.backoff_after(failed_attempt);
        match error {
            AIError::RateLimited { retry_after_secs } => {
                backoff.max(Duration::from_secs(u64::from(*retry_after_secs)))
            }
            _ => backoff,
        }
    }

    /// Runs `attempt` until it succeeds or the policy gives up.
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn execute<T, F, Fut>(&self, mut attempt: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AIError>>,
    {
        let mut state = RetryState::Attempting { attempt: 1 };
        loop {
            state = match state {
                RetryState::Attempting { attempt: n } => {
                    debug!(attempt = n, max_attempts = self.max_attempts, "Attempting provider call");
                    match timeout(self.attempt_timeout, attempt(n)).await {
                        Ok(Ok(value)) => RetryState::Success { value, attempts: n },
                        Ok(Err(error)) => self.after_failure(n, error),
                        Err(_) => self.after_failure(n, AIError::timeout(self.attempt_timeout)),
                    }
                }
                RetryState::Retrying { attempt: n, error } => {
                    let delay = self.delay_after(n, &error);
                    warn!(
                        attempt = n,
                        max_attempts = self.max_attempts,
                        error = %error,
                        transient = error.is_retryable(),
                        delay_ms = delay.as_millis() as u64,
                        "Provider call failed, backing off"
                    );
                    sleep(delay).await;
                    RetryState::Attempting { attempt: n + 1 }
                }
                RetryState::Success { value, attempts } => {
                    return RetryOutcome::Success { value, attempts }
                }
                RetryState::Exhausted {
                    attempts,
                    last_error,
                } => {
                    return RetryOutcome::Exhausted {
                        attempts,
                        last_error,
                    }
                }
            };
        }
    }

    fn after_failure<T>(&self, attempt: u32, error: AIError) -> RetryState<T> {
        if attempt >= self.max_attempts {
            RetryState::Exhausted {
                attempts: attempt,
                last_error: error,
            }
        } else {
            RetryState::Retrying { attempt, error }
        }
    }
}

enum RetryState<T> {
    Attempting { attempt: u32 },
    /// `attempt` is the attempt that just failed.
    Retrying { attempt: u32, error: AIError },
    Success { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: AIError },
}

/// Terminal state of a retry run.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    Success { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: AIError },
}
