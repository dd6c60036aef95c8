//! Retry configuration resolution
//!
//! [`RetryOptions`] is the caller-facing, possibly partial configuration.
//! [`RetryOptions::resolve`] turns it into a valid [`RetryPolicy`] and never
//! fails: a field that is missing or breaks its rule is replaced by its
//! default.
//!
//! | field | rule | default |
//! |---|---|---|
//! | `max_attempts` | `>= 1` | 5 |
//! | `base_delay` | any | 1s |
//! | `delay_multiplier` | finite, `>= 1` | 1.0 |
//! | `overall_timeout` | `> 0` | 10min |
//!
//! The same rule applies to the two loosely typed inputs: serde
//! deserialization (a mistyped field counts as missing) and the positional
//! [`RetryOptions::from_values`] decoder.

use crate::{
    DEFAULT_BASE_DELAY, DEFAULT_DELAY_MULTIPLIER, DEFAULT_MAX_ATTEMPTS, DEFAULT_OVERALL_TIMEOUT,
    RetryPolicy,
};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Number of leading positions [`RetryOptions::from_values`] interprets.
pub const RECOGNIZED_POSITIONS: usize = 4;

/// Partial retry configuration
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use retry_executor::RetryOptions;
///
/// let policy = RetryOptions::new()
///     .max_attempts(0) // invalid, falls back to 5
///     .base_delay(Duration::from_millis(250))
///     .resolve();
///
/// assert_eq!(policy.max_attempts(), 5);
/// assert_eq!(policy.base_delay(), Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(from = "RawOptions")]
pub struct RetryOptions {
    max_attempts: Option<u32>,
    base_delay: Option<Duration>,
    delay_multiplier: Option<f64>,
    overall_timeout: Option<Duration>,
}

/// Policy plus the values to forward to the operation on every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub policy: RetryPolicy,
    pub extras: Vec<Value>,
}

impl RetryOptions {
    /// Create empty options; resolving them yields the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of attempts
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Set the delay after the first failed attempt
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = Some(delay);
        self
    }

    /// Set the delay growth multiplier
    pub fn delay_multiplier(mut self, multiplier: f64) -> Self {
        self.delay_multiplier = Some(multiplier);
        self
    }

    /// Set the overall wall-clock budget
    pub fn overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = Some(timeout);
        self
    }

    /// Resolve into a complete policy, substituting defaults where needed
    pub fn resolve(&self) -> RetryPolicy {
        let max_attempts = match self.max_attempts {
            Some(attempts) if attempts >= 1 => attempts,
            Some(attempts) => {
                tracing::debug!(attempts, "max_attempts must be at least 1, using default");
                DEFAULT_MAX_ATTEMPTS
            }
            None => DEFAULT_MAX_ATTEMPTS,
        };

        let base_delay = self.base_delay.unwrap_or(DEFAULT_BASE_DELAY);

        let multiplier = match self.delay_multiplier {
            Some(multiplier) if multiplier.is_finite() && multiplier >= 1.0 => multiplier,
            Some(multiplier) => {
                tracing::debug!(multiplier, "delay_multiplier must be finite and >= 1, using default");
                DEFAULT_DELAY_MULTIPLIER
            }
            None => DEFAULT_DELAY_MULTIPLIER,
        };

        let overall_timeout = match self.overall_timeout {
            Some(timeout) if !timeout.is_zero() => timeout,
            Some(_) => {
                tracing::debug!("overall_timeout must be positive, using default");
                DEFAULT_OVERALL_TIMEOUT
            }
            None => DEFAULT_OVERALL_TIMEOUT,
        };

        RetryPolicy::from_parts(max_attempts, base_delay, multiplier, overall_timeout)
    }

    /// Decode positional values
    ///
    /// Positions are `[maxAttempts, baseDelaySeconds, delayMultiplier,
    /// overallTimeoutMinutes, ...extras]`. A value of the wrong type or out of
    /// range at a recognized position falls back to that field's default.
    /// Everything after the recognized positions is returned untouched in
    /// [`ResolvedOptions::extras`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use serde_json::json;
    /// use retry_executor::RetryOptions;
    ///
    /// let resolved = RetryOptions::from_values(&[json!("three"), json!(2), json!(1.5), json!(1), json!("token")]);
    ///
    /// assert_eq!(resolved.policy.max_attempts(), 5);
    /// assert_eq!(resolved.policy.multiplier(), 1.5);
    /// assert_eq!(resolved.extras, vec![json!("token")]);
    /// ```
    pub fn from_values(values: &[Value]) -> ResolvedOptions {
        let at = |index: usize| values.get(index);

        let options = Self {
            max_attempts: at(0).and_then(attempts_from),
            base_delay: at(1).and_then(seconds_from),
            delay_multiplier: at(2).and_then(multiplier_from),
            overall_timeout: at(3).and_then(minutes_from),
        };

        for (index, value) in values.iter().take(RECOGNIZED_POSITIONS).enumerate() {
            let accepted = match index {
                0 => options.max_attempts.is_some(),
                1 => options.base_delay.is_some(),
                2 => options.delay_multiplier.is_some(),
                _ => options.overall_timeout.is_some(),
            };
            if !accepted {
                tracing::debug!(position = index, %value, "ignoring mistyped retry option");
            }
        }

        ResolvedOptions {
            policy: options.resolve(),
            extras: values.iter().skip(RECOGNIZED_POSITIONS).cloned().collect(),
        }
    }
}

impl From<RetryPolicy> for RetryOptions {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            max_attempts: Some(policy.max_attempts()),
            base_delay: Some(policy.base_delay()),
            delay_multiplier: Some(policy.multiplier()),
            overall_timeout: Some(policy.overall_timeout()),
        }
    }
}

impl From<RetryOptions> for RetryPolicy {
    fn from(options: RetryOptions) -> Self {
        options.resolve()
    }
}

/// Wire shape for serde: every field is loose and coerced afterwards.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawOptions {
    max_attempts: Option<Value>,
    base_delay_seconds: Option<Value>,
    delay_multiplier: Option<Value>,
    overall_timeout_minutes: Option<Value>,
}

impl From<RawOptions> for RetryOptions {
    fn from(raw: RawOptions) -> Self {
        Self {
            max_attempts: raw.max_attempts.as_ref().and_then(attempts_from),
            base_delay: raw.base_delay_seconds.as_ref().and_then(seconds_from),
            delay_multiplier: raw.delay_multiplier.as_ref().and_then(multiplier_from),
            overall_timeout: raw.overall_timeout_minutes.as_ref().and_then(minutes_from),
        }
    }
}

fn attempts_from(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

fn seconds_from(value: &Value) -> Option<Duration> {
    value.as_u64().map(Duration::from_secs)
}

fn multiplier_from(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn minutes_from(value: &Value) -> Option<Duration> {
    value
        .as_u64()
        .map(|minutes| Duration::from_secs(minutes.saturating_mul(60)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_options_resolve_to_defaults() {
        assert_eq!(RetryOptions::new().resolve(), RetryPolicy::default());
    }

    #[test]
    fn test_builder_values_are_kept() {
        let policy = RetryOptions::new()
            .max_attempts(3)
            .base_delay(Duration::from_millis(10))
            .delay_multiplier(2.5)
            .overall_timeout(Duration::from_secs(30))
            .resolve();

        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.base_delay(), Duration::from_millis(10));
        assert_eq!(policy.multiplier(), 2.5);
        assert_eq!(policy.overall_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let policy = RetryOptions::new()
            .max_attempts(0)
            .delay_multiplier(0.5)
            .overall_timeout(Duration::ZERO)
            .resolve();

        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.multiplier(), 1.0);
        assert_eq!(policy.overall_timeout(), Duration::from_secs(600));

        let policy = RetryOptions::new().delay_multiplier(f64::NAN).resolve();
        assert_eq!(policy.multiplier(), 1.0);

        let policy = RetryOptions::new().delay_multiplier(f64::INFINITY).resolve();
        assert_eq!(policy.multiplier(), 1.0);
    }

    #[test]
    fn test_zero_base_delay_is_valid() {
        let policy = RetryOptions::new().base_delay(Duration::ZERO).resolve();
        assert_eq!(policy.base_delay(), Duration::ZERO);
    }

    #[test]
    fn test_positional_values() {
        let resolved = RetryOptions::from_values(&[json!(3), json!(2), json!(2.0), json!(1)]);

        assert_eq!(resolved.policy.max_attempts(), 3);
        assert_eq!(resolved.policy.base_delay(), Duration::from_secs(2));
        assert_eq!(resolved.policy.multiplier(), 2.0);
        assert_eq!(resolved.policy.overall_timeout(), Duration::from_secs(60));
        assert!(resolved.extras.is_empty());
    }

    #[test]
    fn test_positional_mistyped_max_attempts_uses_default() {
        let resolved = RetryOptions::from_values(&[json!("five"), json!(1)]);

        assert_eq!(resolved.policy.max_attempts(), 5);
        assert_eq!(resolved.policy.base_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_positional_partial_and_out_of_range() {
        let resolved = RetryOptions::from_values(&[json!(-1), json!(-3), json!(0.2)]);

        assert_eq!(resolved.policy, RetryPolicy::default());

        let resolved = RetryOptions::from_values(&[]);
        assert_eq!(resolved.policy, RetryPolicy::default());
        assert!(resolved.extras.is_empty());
    }

    #[test]
    fn test_positional_extras_pass_through() {
        let resolved = RetryOptions::from_values(&[
            json!(2),
            json!(0),
            json!(1),
            json!(5),
            json!("https://example.invalid"),
            json!({"retry": true}),
            json!(null),
        ]);

        assert_eq!(resolved.policy.max_attempts(), 2);
        assert_eq!(resolved.policy.overall_timeout(), Duration::from_secs(300));
        assert_eq!(
            resolved.extras,
            vec![json!("https://example.invalid"), json!({"retry": true}), json!(null)]
        );
    }

    #[test]
    fn test_deserialize_lenient() {
        let options: RetryOptions = serde_json::from_value(json!({
            "maxAttempts": "many",
            "baseDelaySeconds": 2,
            "delayMultiplier": 3,
            "overallTimeoutMinutes": [1],
            "unrelated": "ignored"
        }))
        .unwrap();

        let policy = options.resolve();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.base_delay(), Duration::from_secs(2));
        assert_eq!(policy.multiplier(), 3.0);
        assert_eq!(policy.overall_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_deserialize_empty_object() {
        let options: RetryOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, RetryOptions::new());
    }

    #[test]
    fn test_policy_round_trips_through_options() {
        let policy = RetryOptions::new().max_attempts(7).delay_multiplier(1.5).resolve();
        assert_eq!(RetryOptions::from(policy).resolve(), policy);
    }
}
