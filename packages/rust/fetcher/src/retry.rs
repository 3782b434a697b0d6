//! Bounded retry/backoff state machine for fetch attempts.
//!
//! The machine is independent of the transport: the fetch loop reports each
//! failure's classification and the policy answers with the next state.
//! Attempts are 1-based; `max_retries` counts retries after the first
//! attempt, so a policy with `max_retries = 3` allows four attempts total.

use std::time::Duration;

use patentinsight_shared::FetchErrorKind;

/// Extra backoff multiplier when the remote signals rate-limiting.
const BLOCKED_DELAY_FACTOR: u32 = 5;

/// Where the fetch loop is within its retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Perform the given 1-based attempt.
    Attempt(u32),
    /// Wait for `delay`, then perform `next_attempt`.
    Backoff { next_attempt: u32, delay: Duration },
    /// The retry budget is exhausted, or the failure is not retryable.
    GiveUp,
}

/// Retry budget and backoff schedule.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Initial state: the first attempt.
    pub fn start(&self) -> RetryState {
        RetryState::Attempt(1)
    }

    /// Transition after `attempt` (1-based) failed with `kind`.
    ///
    /// The backoff delay doubles with each retry; blocked failures wait
    /// [`BLOCKED_DELAY_FACTOR`] times longer at each step. Invalid URLs are
    /// never retried.
    pub fn after_failure(&self, attempt: u32, kind: FetchErrorKind) -> RetryState {
        if kind == FetchErrorKind::InvalidUrl {
            return RetryState::GiveUp;
        }
        if attempt > self.max_retries {
            return RetryState::GiveUp;
        }

        let doubling = 2u32.saturating_pow(attempt.saturating_sub(1));
        let mut delay = self.base_delay.saturating_mul(doubling);
        if kind == FetchErrorKind::Blocked {
            delay = delay.saturating_mul(BLOCKED_DELAY_FACTOR);
        }

        RetryState::Backoff {
            next_attempt: attempt + 1,
            delay,
        }
    }
}
