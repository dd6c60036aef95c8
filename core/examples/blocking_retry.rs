//! Blocking retry example
//!
//! Demonstrates the blocking executor: exponential backoff, the deadline,
//! selective retry and positional configuration with forwarded extras.
//!
//! Run with: RUST_LOG=debug cargo run --example blocking_retry

use retry_executor::{
    DeadlineSleeper, RetryError, RetryExecutor, RetryOptions, Retryable, execute,
    execute_with_context,
};
use serde_json::{Value, json};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("request timed out")]
    Timeout,
    #[error("server error")]
    ServerError,
    #[error("not found")]
    NotFound,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== retry-executor blocking examples ===\n");

    // 1. Exponential backoff, success on the third attempt
    println!("1. Exponential backoff - success after retries:");
    let mut attempt_count = 0;
    let result = execute(
        || {
            attempt_count += 1;
            println!("   Attempt {}", attempt_count);
            if attempt_count < 3 {
                Err(ApiError::Timeout)
            } else {
                Ok("Success!")
            }
        },
        |value| println!("   on_success: {}", value),
        RetryOptions::new()
            .max_attempts(5)
            .base_delay(Duration::from_millis(100))
            .delay_multiplier(2.0),
    );
    println!("   Result: {:?}\n", result);

    // 2. Selective retry: NotFound is permanent
    println!("2. Conditional retry (only timeouts):");
    attempt_count = 0;
    let result: Result<_, RetryError<ApiError>> = (|| {
        attempt_count += 1;
        println!("   Attempt {}", attempt_count);
        if attempt_count == 1 {
            Err(ApiError::Timeout)
        } else {
            Err::<&str, _>(ApiError::NotFound)
        }
    })
    .retry(RetryOptions::new().base_delay(Duration::from_millis(50)))
    .when(|e| matches!(e, ApiError::Timeout))
    .notify(|err, attempt, delay| {
        println!("   -> attempt {} failed ({}), retrying after {:?}", attempt, err, delay);
    })
    .call();
    println!("   Result: {:?}\n", result);

    // 3. Attempt budget exhausted
    println!("3. Retries exhausted:");
    attempt_count = 0;
    let result = RetryExecutor::new(
        RetryOptions::new()
            .max_attempts(3)
            .base_delay(Duration::from_millis(10))
            .delay_multiplier(3.0),
    )
    .run(|| {
        attempt_count += 1;
        println!("   Attempt {}", attempt_count);
        Err::<(), _>(ApiError::ServerError)
    });
    if let Err(err) = &result {
        println!("   Error: {} (last failure: {:?})\n", err, err.last_error());
    }

    // 4. Deadline shorter than the backoff, with a deadline-bound sleeper
    println!("4. Deadline exceeded:");
    let result = RetryExecutor::new(
        RetryOptions::new()
            .base_delay(Duration::from_secs(10))
            .overall_timeout(Duration::from_millis(200)),
    )
    .with_sleeper(DeadlineSleeper)
    .run(|| Err::<(), _>(ApiError::Timeout));
    println!("   Result: {:?}\n", result);

    // 5. Positional configuration, trailing values forwarded to the operation
    println!("5. Positional options with forwarded extras:");
    let resolved = RetryOptions::from_values(&[
        json!("not a number"),
        json!(0),
        json!(1),
        json!(1),
        json!("https://api.example.invalid/items"),
    ]);
    println!("   Policy: {:?}", resolved.policy);
    let result = execute_with_context(
        resolved.extras.as_slice(),
        |extras: &[Value]| {
            println!("   Calling with {:?}", extras);
            Ok::<_, ApiError>(extras.len())
        },
        |count| println!("   on_success: {} forwarded value(s)", count),
        resolved.policy,
    );
    println!("   Result: {:?}", result);

    println!("\n=== All examples completed ===");
}
