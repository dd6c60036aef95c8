//! Backoff scheduling between attempts
//!
//! The delay after failed attempt `n` is `base_delay * multiplier^(n-1)`.
//! No delay exists after the final permitted attempt. Jitter is opt-in.

use crate::RetryPolicy;
#[cfg(feature = "async")]
use crate::async_retry::AsyncSleeper;
use crate::deadline::Deadline;
use crate::sleep::{Sleeper, StdSleeper};
use rand::Rng;
use std::time::Duration;

/// Computes backoff delays and performs the wait through a [`Sleeper`]
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use rand::SeedableRng;
/// use rand::rngs::SmallRng;
/// use retry_executor::{BackoffScheduler, RetryOptions};
///
/// let policy = RetryOptions::new()
///     .max_attempts(3)
///     .base_delay(Duration::from_secs(1))
///     .delay_multiplier(2.0)
///     .resolve();
/// let scheduler = BackoffScheduler::new(policy);
/// let mut rng = SmallRng::seed_from_u64(7);
///
/// assert_eq!(scheduler.delay_after(1, &mut rng), Some(Duration::from_secs(1)));
/// assert_eq!(scheduler.delay_after(2, &mut rng), Some(Duration::from_secs(2)));
/// assert_eq!(scheduler.delay_after(3, &mut rng), None); // final attempt
/// ```
#[derive(Debug, Clone)]
pub struct BackoffScheduler<S = StdSleeper> {
    policy: RetryPolicy,
    jitter_factor: f64,
    sleeper: S,
}

impl BackoffScheduler<StdSleeper> {
    /// Scheduler that blocks the calling thread for the full delay.
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, StdSleeper)
    }
}

impl<S> BackoffScheduler<S> {
    /// Scheduler that waits through the given sleeper.
    pub fn with_sleeper(policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            policy,
            jitter_factor: 0.0,
            sleeper,
        }
    }

    /// Set the jitter factor (0.0 = exact delays, 1.0 = full jitter)
    ///
    /// Values outside `[0, 1]` are clamped; NaN disables jitter.
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = if factor.is_nan() {
            0.0
        } else {
            factor.clamp(0.0, 1.0)
        };
        self
    }

    /// Replace the sleeper, keeping policy and jitter.
    pub fn sleeper<S2>(self, sleeper: S2) -> BackoffScheduler<S2> {
        BackoffScheduler {
            policy: self.policy,
            jitter_factor: self.jitter_factor,
            sleeper,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Delay to wait after `attempt` failed, or `None` if it was the last one
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt that just failed (1-indexed)
    /// * `rng` - Random number generator, only drawn from when jitter is enabled
    pub fn delay_after<R: Rng>(&self, attempt: u32, rng: &mut R) -> Option<Duration> {
        if !self.policy.should_retry(attempt) {
            return None;
        }

        let delay = self.policy.delay_for(attempt);
        if self.jitter_factor == 0.0 {
            return Some(delay);
        }

        // delay * (1 - j + r * j): j = 0.1 keeps 90-100% of the delay
        let random_scalar: f64 = rng.random_range(0.0..=1.0);
        let jitter_blend = 1.0 - self.jitter_factor + random_scalar * self.jitter_factor;
        Some(delay.mul_f64(jitter_blend))
    }
}

impl<S: Sleeper> BackoffScheduler<S> {
    /// Block for `delay` through the configured sleeper
    pub fn wait(&self, delay: Duration, deadline: &Deadline) {
        tracing::debug!(?delay, remaining = ?deadline.remaining(), "backing off");
        self.sleeper.sleep(delay, deadline);
    }

    /// Wait out the backoff that follows `attempt`
    ///
    /// Returns the delay that was handed to the sleeper, or `None` without
    /// waiting when `attempt` was the final permitted attempt.
    pub fn wait_after<R: Rng>(
        &self,
        attempt: u32,
        deadline: &Deadline,
        rng: &mut R,
    ) -> Option<Duration> {
        let delay = self.delay_after(attempt, rng)?;
        self.wait(delay, deadline);
        Some(delay)
    }
}

#[cfg(feature = "async")]
impl<S: AsyncSleeper> BackoffScheduler<S> {
    /// Async counterpart of [`BackoffScheduler::wait`]
    pub async fn wait_async(&self, delay: Duration, deadline: &Deadline) {
        tracing::debug!(?delay, remaining = ?deadline.remaining(), "backing off");
        AsyncSleeper::sleep(&self.sleeper, delay, deadline).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryOptions;
    use crate::sleep::FnSleeper;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::cell::RefCell;

    fn policy(max_attempts: u32, base_ms: u64, multiplier: f64) -> RetryPolicy {
        RetryOptions::new()
            .max_attempts(max_attempts)
            .base_delay(Duration::from_millis(base_ms))
            .delay_multiplier(multiplier)
            .resolve()
    }

    #[test]
    fn test_exponential_delays() {
        let scheduler = BackoffScheduler::new(policy(5, 100, 2.0));
        let mut rng = SmallRng::seed_from_u64(42);

        assert_eq!(scheduler.delay_after(1, &mut rng), Some(Duration::from_millis(100)));
        assert_eq!(scheduler.delay_after(2, &mut rng), Some(Duration::from_millis(200)));
        assert_eq!(scheduler.delay_after(3, &mut rng), Some(Duration::from_millis(400)));
        assert_eq!(scheduler.delay_after(4, &mut rng), Some(Duration::from_millis(800)));
        assert_eq!(scheduler.delay_after(5, &mut rng), None);
    }

    #[test]
    fn test_constant_delays_by_default() {
        let scheduler = BackoffScheduler::new(policy(4, 500, 1.0));
        let mut rng = SmallRng::seed_from_u64(42);

        for attempt in 1..4 {
            assert_eq!(scheduler.delay_after(attempt, &mut rng), Some(Duration::from_millis(500)));
        }
        assert_eq!(scheduler.delay_after(4, &mut rng), None);
    }

    #[test]
    fn test_single_attempt_never_waits() {
        let waits = RefCell::new(Vec::new());
        let scheduler = BackoffScheduler::with_sleeper(
            policy(1, 1_000, 3.0),
            FnSleeper(|delay: Duration| waits.borrow_mut().push(delay)),
        );
        let mut rng = SmallRng::seed_from_u64(42);
        let deadline = Deadline::start(Duration::from_secs(60));

        assert_eq!(scheduler.wait_after(1, &deadline, &mut rng), None);
        assert!(waits.borrow().is_empty());
    }

    #[test]
    fn test_wait_after_uses_sleeper() {
        let waits = RefCell::new(Vec::new());
        let scheduler = BackoffScheduler::new(policy(3, 1_000, 2.0))
            .sleeper(FnSleeper(|delay: Duration| waits.borrow_mut().push(delay)));
        let mut rng = SmallRng::seed_from_u64(42);
        let deadline = Deadline::start(Duration::from_secs(60));

        scheduler.wait_after(1, &deadline, &mut rng);
        scheduler.wait_after(2, &deadline, &mut rng);
        scheduler.wait_after(3, &deadline, &mut rng);

        assert_eq!(
            *waits.borrow(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn test_jitter_bounds() {
        let scheduler = BackoffScheduler::new(policy(10, 1_000, 1.0)).jitter_factor(0.1);
        let mut rng = SmallRng::seed_from_u64(42);

        for attempt in 1..10 {
            let delay = scheduler.delay_after(attempt, &mut rng).unwrap();
            assert!(
                delay >= Duration::from_millis(900) && delay <= Duration::from_millis(1_000),
                "delay {:?} not in range 900-1000ms",
                delay
            );
        }
    }

    #[test]
    fn test_full_jitter_varies() {
        let scheduler = BackoffScheduler::new(policy(10, 1_000, 1.0)).jitter_factor(1.0);
        let mut rng = SmallRng::seed_from_u64(42);
        let delays: Vec<Duration> = (1..10)
            .filter_map(|attempt| scheduler.delay_after(attempt, &mut rng))
            .collect();

        assert!(delays.windows(2).any(|w| w[0] != w[1]));
        assert!(delays.iter().all(|&d| d <= Duration::from_secs(1)));
    }

    #[test]
    fn test_jitter_factor_clamping() {
        let mut rng = SmallRng::seed_from_u64(42);

        let scheduler = BackoffScheduler::new(policy(5, 1_000, 1.0)).jitter_factor(-0.5);
        assert_eq!(scheduler.delay_after(1, &mut rng), Some(Duration::from_secs(1)));

        let scheduler = BackoffScheduler::new(policy(5, 1_000, 1.0)).jitter_factor(f64::NAN);
        assert_eq!(scheduler.delay_after(1, &mut rng), Some(Duration::from_secs(1)));

        let scheduler = BackoffScheduler::new(policy(5, 1_000, 1.0)).jitter_factor(999.0);
        assert!(scheduler.delay_after(1, &mut rng).unwrap() <= Duration::from_secs(1));
    }
}
