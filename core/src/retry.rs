//! Retry execution with a fluent builder API
//!
//! [`RetryExecutor`] runs an operation under a [`RetryPolicy`] on the calling
//! thread: attempts are strictly sequential and every backoff blocks. The
//! [`Retryable`] extension trait offers the same loop as a builder hanging off
//! the operation itself.

use crate::RetryPolicy;
use crate::backoff::BackoffScheduler;
use crate::error::RetryError;
use crate::sleep::{Sleeper, StdSleeper};
use crate::state::{RetryState, Step};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::marker::PhantomData;
use std::time::Duration;

/// A successful execution
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    value: T,
    attempts: u32,
    elapsed: Duration,
}

impl<T> RetryOutcome<T> {
    pub(crate) fn new(value: T, attempts: u32, elapsed: Duration) -> Self {
        Self {
            value,
            attempts,
            elapsed,
        }
    }

    /// The value produced by the successful attempt.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// 1-based index of the attempt that succeeded.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Wall-clock time from the start of the execution to the success.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Runs fallible operations under a retry policy
///
/// The executor holds configuration only. Every call builds its own
/// [`RetryState`], so one executor can serve concurrent executions.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use retry_executor::{RetryExecutor, RetryOptions};
///
/// let executor = RetryExecutor::new(
///     RetryOptions::new()
///         .max_attempts(3)
///         .base_delay(Duration::from_millis(1))
///         .resolve(),
/// );
///
/// let mut calls = 0;
/// let outcome = executor
///     .run(|| {
///         calls += 1;
///         if calls < 3 { Err("busy") } else { Ok("done") }
///     })
///     .unwrap();
///
/// assert_eq!(outcome.attempts(), 3);
/// assert_eq!(outcome.into_inner(), "done");
/// ```
#[derive(Debug, Clone)]
pub struct RetryExecutor<S = StdSleeper> {
    scheduler: BackoffScheduler<S>,
}

impl RetryExecutor<StdSleeper> {
    /// Executor that blocks for the full backoff between attempts.
    pub fn new(policy: impl Into<RetryPolicy>) -> Self {
        Self {
            scheduler: BackoffScheduler::new(policy.into()),
        }
    }
}

impl<S> RetryExecutor<S> {
    /// Replace the wait primitive
    pub fn with_sleeper<S2>(self, sleeper: S2) -> RetryExecutor<S2> {
        RetryExecutor {
            scheduler: self.scheduler.sleeper(sleeper),
        }
    }

    /// Set the jitter factor (0.0 = exact delays, 1.0 = full jitter)
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.scheduler = self.scheduler.jitter_factor(factor);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.scheduler.policy()
    }

    #[cfg(feature = "async")]
    pub(crate) fn scheduler(&self) -> &BackoffScheduler<S> {
        &self.scheduler
    }
}

impl<S: Sleeper> RetryExecutor<S> {
    /// Run `operation` until it succeeds or a budget runs out
    ///
    /// Every failure is retryable.
    pub fn run<F, T, E>(&self, operation: F) -> Result<RetryOutcome<T>, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.run_with(operation, |_: &E| true, |_: &E, _: u32, _: Duration| {})
    }

    /// Run with a retry predicate and a backoff observer
    ///
    /// # Arguments
    ///
    /// * `when` - Returns `false` for failures that must not be retried
    /// * `notify` - Called with the failure, its attempt index, and the delay
    ///   before each backoff wait
    pub fn run_with<F, T, E, W, N>(
        &self,
        mut operation: F,
        when: W,
        mut notify: N,
    ) -> Result<RetryOutcome<T>, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
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

            let error = match operation() {
                Ok(value) => {
                    tracing::debug!(attempt, "attempt succeeded");
                    return Ok(RetryOutcome::new(value, attempt, state.deadline().elapsed()));
                }
                Err(error) => error,
            };

            let retryable = when(&error);
            match state.on_failure(error, retryable, &self.scheduler, &mut rng) {
                Step::Backoff {
                    attempt,
                    delay,
                    error,
                } => {
                    notify(&error, attempt, delay);
                    drop(error);
                    self.scheduler.wait(delay, state.deadline());
                }
                Step::Finished(err) => return Err(err),
            }
        }
    }

    /// Run `operation` and hand a success to `on_success`
    ///
    /// `on_success` is invoked exactly once when an attempt succeeds and never
    /// otherwise.
    pub fn execute<F, C, T, E>(&self, operation: F, on_success: C) -> Result<(), RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        C: FnOnce(T),
    {
        let outcome = self.run(operation)?;
        on_success(outcome.into_inner());
        Ok(())
    }

    /// Like [`RetryExecutor::execute`], forwarding the same `context` to every
    /// attempt.
    pub fn execute_with_context<X, F, C, T, E>(
        &self,
        context: &X,
        mut operation: F,
        on_success: C,
    ) -> Result<(), RetryError<E>>
    where
        X: ?Sized,
        F: FnMut(&X) -> Result<T, E>,
        C: FnOnce(T),
    {
        self.execute(|| operation(context), on_success)
    }
}

/// Run `operation` under `options`, invoking `on_success` once on success
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use retry_executor::{RetryError, RetryOptions, execute};
///
/// let options = RetryOptions::new().max_attempts(2).base_delay(Duration::ZERO);
/// let result = execute(|| Err::<(), _>("down"), |_| unreachable!(), options);
///
/// assert!(matches!(result, Err(RetryError::RetriesExhausted { attempts: 2, .. })));
/// ```
pub fn execute<F, C, T, E>(
    operation: F,
    on_success: C,
    options: impl Into<RetryPolicy>,
) -> Result<(), RetryError<E>>
where
    F: FnMut() -> Result<T, E>,
    C: FnOnce(T),
{
    RetryExecutor::new(options).execute(operation, on_success)
}

/// Run `operation` under `options`, forwarding `context` to every attempt
///
/// Pairs with [`RetryOptions::from_values`](crate::RetryOptions::from_values):
///
/// ```rust
/// use serde_json::{Value, json};
/// use retry_executor::{RetryOptions, execute_with_context};
///
/// let resolved = RetryOptions::from_values(&[json!(3), json!(0), json!(1), json!(1), json!("payload")]);
/// let mut seen = Vec::new();
///
/// execute_with_context(
///     resolved.extras.as_slice(),
///     |extras: &[Value]| Ok::<_, ()>(extras.len()),
///     |len| seen.push(len),
///     resolved.policy,
/// )
/// .unwrap();
///
/// assert_eq!(seen, vec![1]);
/// ```
pub fn execute_with_context<X, F, C, T, E>(
    context: &X,
    operation: F,
    on_success: C,
    options: impl Into<RetryPolicy>,
) -> Result<(), RetryError<E>>
where
    X: ?Sized,
    F: FnMut(&X) -> Result<T, E>,
    C: FnOnce(T),
{
    RetryExecutor::new(options).execute_with_context(context, operation, on_success)
}

/// Extension trait that adds `.retry()` to functions and closures
///
/// Implemented for every `FnMut() -> Result<T, E>`.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use retry_executor::{Retryable, RetryOptions};
///
/// fn fetch_data() -> Result<String, std::io::Error> {
///     Ok("data".to_string())
/// }
///
/// let outcome = fetch_data
///     .retry(RetryOptions::new().base_delay(Duration::from_millis(10)))
///     .call()
///     .unwrap();
/// assert_eq!(outcome.attempts(), 1);
/// ```
pub trait Retryable<T, E>: Sized {
    /// Begin building a retry execution under the given policy
    fn retry(self, policy: impl Into<RetryPolicy>) -> RetryBuilder<Self, T, E>;
}

impl<F, T, E> Retryable<T, E> for F
where
    F: FnMut() -> Result<T, E>,
{
    fn retry(self, policy: impl Into<RetryPolicy>) -> RetryBuilder<Self, T, E> {
        RetryBuilder {
            operation: self,
            executor: RetryExecutor::new(policy),
            when: None,
            notify: None,
            _phantom: PhantomData,
        }
    }
}

/// Builder for configuring and executing a retry
///
/// Created by calling `.retry()` on a function or closure.
///
/// # Type Parameters
///
/// * `F` - The operation function type
/// * `T` - The success return type
/// * `E` - The error type
/// * `S` - The sleeper type
/// * `W` - The retry predicate type
/// * `N` - The backoff observer type
pub struct RetryBuilder<
    F,
    T,
    E,
    S = StdSleeper,
    W = fn(&E) -> bool,
    N = fn(&E, u32, Duration),
> {
    operation: F,
    executor: RetryExecutor<S>,
    when: Option<W>,
    notify: Option<N>,
    _phantom: PhantomData<fn() -> (T, E)>,
}

impl<F, T, E, S, W, N> RetryBuilder<F, T, E, S, W, N>
where
    F: FnMut() -> Result<T, E>,
{
    /// Only retry failures for which `predicate` returns `true`
    ///
    /// Any other failure ends the execution with
    /// [`RetryError::NotRetryable`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use retry_executor::{RetryError, RetryOptions, Retryable};
    ///
    /// #[derive(Debug)]
    /// enum ApiError {
    ///     Timeout,
    ///     NotFound,
    /// }
    ///
    /// let result = (|| Err::<(), _>(ApiError::NotFound))
    ///     .retry(RetryOptions::new().base_delay(Duration::ZERO))
    ///     .when(|e| matches!(e, ApiError::Timeout))
    ///     .call();
    ///
    /// assert!(matches!(result, Err(RetryError::NotRetryable { attempt: 1, .. })));
    /// ```
    pub fn when<P>(self, predicate: P) -> RetryBuilder<F, T, E, S, P, N>
    where
        P: Fn(&E) -> bool,
    {
        RetryBuilder {
            operation: self.operation,
            executor: self.executor,
            when: Some(predicate),
            notify: self.notify,
            _phantom: PhantomData,
        }
    }

    /// Observe each backoff: called with the failure, its attempt index, and
    /// the delay before the next attempt.
    pub fn notify<M>(self, callback: M) -> RetryBuilder<F, T, E, S, W, M>
    where
        M: FnMut(&E, u32, Duration),
    {
        RetryBuilder {
            operation: self.operation,
            executor: self.executor,
            when: self.when,
            notify: Some(callback),
            _phantom: PhantomData,
        }
    }

    /// Replace the wait primitive
    pub fn sleeper<S2>(self, sleeper: S2) -> RetryBuilder<F, T, E, S2, W, N> {
        RetryBuilder {
            operation: self.operation,
            executor: self.executor.with_sleeper(sleeper),
            when: self.when,
            notify: self.notify,
            _phantom: PhantomData,
        }
    }

    /// Set the jitter factor (0.0 = exact delays, 1.0 = full jitter)
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.executor = self.executor.jitter_factor(factor);
        self
    }
}

impl<F, T, E, S, W, N> RetryBuilder<F, T, E, S, W, N>
where
    F: FnMut() -> Result<T, E>,
    S: Sleeper,
    W: Fn(&E) -> bool,
    N: FnMut(&E, u32, Duration),
{
    /// Execute, blocking the calling thread through every backoff
    pub fn call(self) -> Result<RetryOutcome<T>, RetryError<E>> {
        let RetryBuilder {
            operation,
            executor,
            when,
            mut notify,
            ..
        } = self;

        executor.run_with(
            operation,
            |error: &E| when.as_ref().is_none_or(|predicate| predicate(error)),
            |error: &E, attempt: u32, delay: Duration| {
                if let Some(notify) = notify.as_mut() {
                    notify(error, attempt, delay);
                }
            },
        )
    }

    /// Execute with a custom sleeper
    pub fn call_with_sleeper<S2: Sleeper>(self, sleeper: S2) -> Result<RetryOutcome<T>, RetryError<E>> {
        self.sleeper(sleeper).call()
    }

    /// Execute, handing a success to `on_success`
    pub fn call_then<C>(self, on_success: C) -> Result<(), RetryError<E>>
    where
        C: FnOnce(T),
    {
        let outcome = self.call()?;
        on_success(outcome.into_inner());
        Ok(())
    }
}
