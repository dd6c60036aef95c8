//! Absolute deadline derived from a policy's overall timeout.

use std::time::{Duration, Instant};

/// Point in time after which no further attempts start
///
/// Captured once when an execution begins. A timeout too large to add to
/// `Instant::now()` produces a deadline that never passes.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    at: Option<Instant>,
    timeout: Duration,
}

impl Deadline {
    /// Start the clock: `deadline = now + timeout`.
    pub fn start(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            at: started.checked_add(timeout),
            timeout,
        }
    }

    /// Whether the deadline has been reached.
    pub fn has_passed(&self) -> bool {
        match self.at {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        match self.at {
            Some(at) => at.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }

    /// Time since the deadline was started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// The budget this deadline was started with.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
