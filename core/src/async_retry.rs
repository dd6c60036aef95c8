//! Async retry driver (requires the `async` feature)
//!
//! Drives the same [`RetryState`] machine as the blocking executor, but
//! suspends the task instead of the thread during backoff.

use crate::deadline::Deadline;
use crate::error::RetryError;
use crate::retry::{RetryExecutor, RetryOutcome};
use crate::state::{RetryState, Step};
use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::future::Future;
use std::time::Duration;

/// Trait for async wait implementations
#[async_trait]
pub trait AsyncSleeper: Send + Sync {
    /// Wait for `delay`; `deadline` belongs to the running execution.
    async fn sleep(&self, delay: Duration, deadline: &Deadline);
}

/// Tokio timer sleeper
///
/// Waits the full delay by default; [`TokioSleeper::deadline_bound`] caps each
/// wait at the time left before the deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper {
    bounded: bool,
}

impl TokioSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never wait past the execution deadline.
    pub fn deadline_bound() -> Self {
        Self { bounded: true }
    }
}

#[async_trait]
impl AsyncSleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration, deadline: &Deadline) {
        let delay = if self.bounded {
            delay.min(deadline.remaining())
        } else {
            delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl<S: AsyncSleeper> RetryExecutor<S> {
    /// Run `operation` until it succeeds or a budget runs out
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use retry_executor::{RetryExecutor, RetryOptions, TokioSleeper};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let executor = RetryExecutor::new(RetryOptions::new().base_delay(Duration::from_millis(1)))
    ///     .with_sleeper(TokioSleeper::new());
    ///
    /// let outcome = executor.run_async(|| async { Ok::<_, ()>(7) }).await.unwrap();
    /// assert_eq!(outcome.into_inner(), 7);
    /// # }
    /// ```
    pub async fn run_async<F, Fut, T, E>(&self, operation: F) -> Result<RetryOutcome<T>, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_async_with(operation, |_: &E| true, |_: &E, _: u32, _: Duration| {})
            .await
    }

    /// Async counterpart of [`RetryExecutor::run_with`].
    pub async fn run_async_with<F, Fut, T, E, W, N>(
        &self,
        mut operation: F,
        when: W,
        mut notify: N,
    ) -> Result<RetryOutcome<T>, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        W: Fn(&E) -> bool,
        N: FnMut(&E, u32, Duration),
    {
        let mut state = RetryState::start(*self.policy());
        let mut rng = SmallRng::from_os_rng();

        loop {
            let attempt = state.begin_attempt::<E>()?;
            tracing::debug!(
                attempt,
                max_attempts = state.policy().max_attempts(),
                elapsed = ?state.deadline().elapsed(),
                "running attempt"
            );

            let error = match operation().await {
                Ok(value) => {
                    tracing::debug!(attempt, "attempt succeeded");
                    return Ok(RetryOutcome::new(value, attempt, state.deadline().elapsed()));
                }
                Err(error) => error,
            };

            let retryable = when(&error);
            match state.on_failure(error, retryable, self.scheduler(), &mut rng) {
                Step::Backoff {
                    attempt,
                    delay,
                    error,
                } => {
                    notify(&error, attempt, delay);
                    drop(error);
                    self.scheduler().wait_async(delay, state.deadline()).await;
                }
                Step::Finished(err) => return Err(err),
            }
        }
    }

    /// Run `operation` and hand a success to `on_success`.
    pub async fn execute_async<F, Fut, C, T, E>(
        &self,
        operation: F,
        on_success: C,
    ) -> Result<(), RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FnOnce(T),
    {
        let outcome = self.run_async(operation).await?;
        on_success(outcome.into_inner());
        Ok(())
    }
}
