//! Wait primitives used between attempts
//!
//! The executor never sleeps directly; it hands the computed backoff and the
//! execution's [`Deadline`] to a [`Sleeper`]. Swapping the sleeper changes how
//! waits relate to the deadline without touching the retry state machine:
//! - [`StdSleeper`] sleeps the full delay even if the deadline passes mid-wait
//! - [`DeadlineSleeper`] never sleeps past the deadline
//! - [`FnSleeper`] delegates to a closure (custom clocks, tests)

use crate::deadline::Deadline;
use std::time::Duration;

/// Trait for blocking wait implementations
pub trait Sleeper {
    /// Block for `delay`; `deadline` belongs to the running execution.
    fn sleep(&self, delay: Duration, deadline: &Deadline);
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, delay: Duration, deadline: &Deadline) {
        (**self).sleep(delay, deadline);
    }
}

/// Standard library sleeper using `std::thread::sleep`
///
/// Sleeps the whole delay and ignores the deadline.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use retry_executor::{Deadline, Sleeper, StdSleeper};
///
/// let deadline = Deadline::start(Duration::from_secs(1));
/// StdSleeper.sleep(Duration::from_millis(5), &deadline);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StdSleeper;

impl Sleeper for StdSleeper {
    fn sleep(&self, delay: Duration, _deadline: &Deadline) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// Sleeper bounded by the execution deadline
///
/// Sleeps `min(delay, remaining)`, so an execution returns promptly once its
/// time budget is gone instead of finishing a long backoff first.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadlineSleeper;

impl Sleeper for DeadlineSleeper {
    fn sleep(&self, delay: Duration, deadline: &Deadline) {
        let bounded = delay.min(deadline.remaining());
        if bounded < delay {
            tracing::trace!(?delay, ?bounded, "backoff truncated at deadline");
        }
        if !bounded.is_zero() {
            std::thread::sleep(bounded);
        }
    }
}

/// Closure sleeper for custom wait implementations
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::time::Duration;
/// use retry_executor::{Deadline, FnSleeper, Sleeper};
///
/// let waits = RefCell::new(Vec::new());
/// let sleeper = FnSleeper(|delay: Duration| waits.borrow_mut().push(delay));
///
/// sleeper.sleep(Duration::from_millis(100), &Deadline::start(Duration::from_secs(1)));
/// assert_eq!(waits.into_inner(), vec![Duration::from_millis(100)]);
/// ```
#[derive(Clone, Copy)]
pub struct FnSleeper<F>(pub F);

impl<F> Sleeper for FnSleeper<F>
where
    F: Fn(Duration),
{
    fn sleep(&self, delay: Duration, _deadline: &Deadline) {
        (self.0)(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Instant;

    #[test]
    fn test_std_sleeper_ignores_deadline() {
        let deadline = Deadline::start(Duration::from_millis(1));
        let start = Instant::now();
        StdSleeper.sleep(Duration::from_millis(20), &deadline);

        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_deadline_sleeper_stops_at_deadline() {
        let deadline = Deadline::start(Duration::from_millis(10));
        let start = Instant::now();
        DeadlineSleeper.sleep(Duration::from_secs(5), &deadline);

        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(deadline.has_passed());
    }

    #[test]
    fn test_deadline_sleeper_short_delay() {
        let deadline = Deadline::start(Duration::from_secs(60));
        let start = Instant::now();
        DeadlineSleeper.sleep(Duration::from_millis(10), &deadline);

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(10) && elapsed < Duration::from_secs(1));
    }

    #[test]
    fn test_fn_sleeper() {
        let total = Cell::new(Duration::ZERO);
        let sleeper = FnSleeper(|delay: Duration| total.set(total.get() + delay));
        let deadline = Deadline::start(Duration::from_secs(1));

        sleeper.sleep(Duration::from_millis(100), &deadline);
        (&sleeper).sleep(Duration::from_millis(50), &deadline);

        assert_eq!(total.get(), Duration::from_millis(150));
    }
}
