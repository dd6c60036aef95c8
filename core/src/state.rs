//! Termination state machine of one execution
//!
//! ```text
//! Idle -> Attempting -> Succeeded
//!            |  ^   \-> Exhausted | NotRetryable
//!            v  |
//!          Backoff
//!            |
//!            \-> Cancelled (deadline passed before the next attempt)
//! ```
//!
//! [`RetryState`] only makes decisions; drivers (blocking or async) invoke the
//! operation and perform the waits.

use crate::RetryPolicy;
use crate::backoff::BackoffScheduler;
use crate::deadline::Deadline;
use crate::error::RetryError;
use rand::Rng;
use std::time::Duration;

/// What follows a failed attempt.
#[derive(Debug)]
pub enum Step<E> {
    /// Wait `delay`, then start the next attempt. `error` is the failure of
    /// `attempt`, handed out for observers before it is discarded.
    Backoff {
        attempt: u32,
        delay: Duration,
        error: E,
    },
    /// Terminal failure.
    Finished(RetryError<E>),
}

/// Attempt counter and deadline of a single execution
///
/// Created per execution and never shared, so concurrent executions cannot
/// observe each other's counters or deadlines.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    deadline: Deadline,
    attempt: u32,
}

impl RetryState {
    /// Leave `Idle`: capture the deadline.
    pub fn start(policy: RetryPolicy) -> Self {
        Self {
            deadline: Deadline::start(policy.overall_timeout()),
            policy,
            attempt: 0,
        }
    }

    /// Attempts started so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Enter `Attempting`, returning the 1-based index of the new attempt
    ///
    /// The first attempt always starts. Every later one is refused with
    /// [`RetryError::DeadlineExceeded`] once the deadline has passed.
    pub fn begin_attempt<E>(&mut self) -> Result<u32, RetryError<E>> {
        if self.attempt > 0 && self.deadline.has_passed() {
            tracing::warn!(
                attempts = self.attempt,
                timeout = ?self.deadline.timeout(),
                "retry deadline exceeded"
            );
            return Err(RetryError::DeadlineExceeded {
                attempts: self.attempt,
                timeout: self.deadline.timeout(),
            });
        }

        self.attempt += 1;
        Ok(self.attempt)
    }

    /// Decide what follows a failure of the current attempt
    ///
    /// * `retryable` - verdict of the retry predicate for `error`
    pub fn on_failure<E, S, R: Rng>(
        &self,
        error: E,
        retryable: bool,
        scheduler: &BackoffScheduler<S>,
        rng: &mut R,
    ) -> Step<E> {
        let attempt = self.attempt;

        if !retryable {
            tracing::warn!(attempt, "attempt failed with a non-retryable error");
            return Step::Finished(RetryError::NotRetryable {
                attempt,
                source: error,
            });
        }

        // None: the attempt budget is used up
        match scheduler.delay_after(attempt, rng) {
            Some(delay) => Step::Backoff {
                attempt,
                delay,
                error,
            },
            None => {
                tracing::warn!(attempts = attempt, "retries exhausted");
                Step::Finished(RetryError::RetriesExhausted {
                    attempts: attempt,
                    source: error,
                })
            }
        }
    }
}
