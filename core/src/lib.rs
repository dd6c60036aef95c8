//! retry-executor - deadline-bounded retries with exponential backoff
//!
//! This crate runs a fallible operation repeatedly under two budgets: a
//! maximum number of attempts and an overall wall-clock timeout. Between
//! attempts it waits `base_delay * multiplier^(attempt - 1)`.
//!
//! # Features
//!
//! - **Two budgets**: attempts and wall-clock time, whichever runs out first
//! - **Lenient configuration**: missing or invalid options fall back to defaults
//! - **Pluggable waits**: full blocking sleep, deadline-bound sleep, or custom
//! - **Selective retry**: optional predicate, every failure is retryable by default
//! - **Async driver**: the same state machine on tokio (`async` feature)
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use retry_executor::{RetryOptions, execute};
//!
//! let options = RetryOptions::new()
//!     .max_attempts(3)
//!     .base_delay(Duration::from_millis(1))
//!     .delay_multiplier(2.0);
//!
//! let mut calls = 0;
//! let result = execute(
//!     || {
//!         calls += 1;
//!         if calls < 2 { Err("not yet") } else { Ok(calls) }
//!     },
//!     |value| println!("succeeded with {value}"),
//!     options,
//! );
//!
//! assert!(result.is_ok());
//! ```

pub mod backoff;
pub mod config;
pub mod deadline;
pub mod error;
pub mod retry;
pub mod sleep;
pub mod state;

#[cfg(feature = "async")]
pub mod async_retry;

#[cfg(feature = "async")]
pub use async_retry::{AsyncSleeper, TokioSleeper};
pub use backoff::BackoffScheduler;
pub use config::{ResolvedOptions, RetryOptions};
pub use deadline::Deadline;
pub use error::RetryError;
pub use retry::{
    RetryBuilder, RetryExecutor, RetryOutcome, Retryable, execute, execute_with_context,
};
pub use sleep::{DeadlineSleeper, FnSleeper, Sleeper, StdSleeper};
pub use state::{RetryState, Step};

use std::time::Duration;

/// Default maximum number of attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
/// Default backoff multiplier (no growth).
pub const DEFAULT_DELAY_MULTIPLIER: f64 = 1.0;
/// Default overall time budget.
pub const DEFAULT_OVERALL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Resolved retry policy for a single execution
///
/// A policy is always valid: `max_attempts >= 1`, `multiplier` finite and
/// `>= 1`, `overall_timeout > 0`. The only way to obtain one with custom values
/// is [`RetryOptions::resolve`], which substitutes defaults for anything that
/// would break those rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    multiplier: f64,
    overall_timeout: Duration,
}

impl RetryPolicy {
    /// Create a policy with default values
    ///
    /// # Default values
    ///
    /// - `max_attempts`: 5
    /// - `base_delay`: 1s
    /// - `multiplier`: 1.0
    /// - `overall_timeout`: 10min
    pub const fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            multiplier: DEFAULT_DELAY_MULTIPLIER,
            overall_timeout: DEFAULT_OVERALL_TIMEOUT,
        }
    }

    pub(crate) const fn from_parts(
        max_attempts: u32,
        base_delay: Duration,
        multiplier: f64,
        overall_timeout: Duration,
    ) -> Self {
        Self {
            max_attempts,
            base_delay,
            multiplier,
            overall_timeout,
        }
    }

    /// Maximum number of operation invocations.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay inserted after the first failed attempt.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Growth factor applied to the delay after each further failure.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Wall-clock budget for the whole execution.
    pub fn overall_timeout(&self) -> Duration {
        self.overall_timeout
    }

    /// Calculate the delay that follows a failure of the given attempt
    ///
    /// Returns `base_delay * multiplier^(attempt - 1)`. Huge results saturate
    /// at `u64::MAX` nanoseconds.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt that just failed (1-indexed)
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use retry_executor::RetryOptions;
    ///
    /// let policy = RetryOptions::new()
    ///     .base_delay(Duration::from_secs(1))
    ///     .delay_multiplier(2.0)
    ///     .resolve();
    ///
    /// assert_eq!(policy.delay_for(1), Duration::from_secs(1));
    /// assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    /// ```
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        if exponent == 0 || self.multiplier == 1.0 {
            return self.base_delay;
        }

        let exponent = i32::try_from(exponent).unwrap_or(i32::MAX);
        let nanos = (self.base_delay.as_nanos() as f64) * self.multiplier.powi(exponent);
        if nanos >= u64::MAX as f64 {
            Duration::from_nanos(u64::MAX)
        } else {
            Duration::from_nanos(nanos as u64)
        }
    }

    /// Check if another attempt may follow the given one
    ///
    /// # Arguments
    ///
    /// * `current_attempt` - Current attempt number (1-indexed)
    pub fn should_retry(&self, current_attempt: u32) -> bool {
        current_attempt < self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}
