//! Terminal failures of a retry execution.

use std::time::Duration;
use thiserror::Error;

/// Why an execution ended without a success
///
/// Both budget failures are distinct from the operation's own error type `E`.
/// When the attempt budget runs out, the last failure is kept for diagnosis
/// and exposed through [`std::error::Error::source`].
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The overall timeout elapsed before another attempt could start.
    #[error("retry deadline of {timeout:?} exceeded after {attempts} attempt(s)")]
    DeadlineExceeded { attempts: u32, timeout: Duration },

    /// Every permitted attempt failed.
    #[error("retries exhausted after {attempts} attempt(s)")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: E,
    },

    /// The retry predicate rejected a failure.
    #[error("attempt {attempt} failed with a non-retryable error")]
    NotRetryable {
        attempt: u32,
        #[source]
        source: E,
    },
}

impl<E> RetryError<E> {
    /// Number of operation invocations made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::DeadlineExceeded { attempts, .. } => *attempts,
            RetryError::RetriesExhausted { attempts, .. } => *attempts,
            RetryError::NotRetryable { attempt, .. } => *attempt,
        }
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, RetryError::DeadlineExceeded { .. })
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::RetriesExhausted { .. })
    }

    /// The wrapped operation failure, if the variant carries one.
    pub fn into_source(self) -> Option<E> {
        match self {
            RetryError::DeadlineExceeded { .. } => None,
            RetryError::RetriesExhausted { source, .. } | RetryError::NotRetryable { source, .. } => {
                Some(source)
            }
        }
    }

    /// Borrowing counterpart of [`RetryError::into_source`].
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::DeadlineExceeded { .. } => None,
            RetryError::RetriesExhausted { source, .. } | RetryError::NotRetryable { source, .. } => {
                Some(source)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, Error, PartialEq)]
    #[error("connection refused")]
    struct Refused;

    #[test]
    fn test_display() {
        let err: RetryError<Refused> = RetryError::DeadlineExceeded {
            attempts: 2,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(err.to_string(), "retry deadline of 1s exceeded after 2 attempt(s)");

        let err = RetryError::RetriesExhausted {
            attempts: 3,
            source: Refused,
        };
        assert_eq!(err.to_string(), "retries exhausted after 3 attempt(s)");
    }

    #[test]
    fn test_source_chain() {
        let err = RetryError::RetriesExhausted {
            attempts: 3,
            source: Refused,
        };

        assert_eq!(err.source().map(|s| s.to_string()), Some("connection refused".to_string()));
        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), 3);
        assert_eq!(err.into_source(), Some(Refused));
    }

    #[test]
    fn test_deadline_has_no_source() {
        let err: RetryError<Refused> = RetryError::DeadlineExceeded {
            attempts: 1,
            timeout: Duration::from_millis(10),
        };

        assert!(err.source().is_none());
        assert!(err.is_deadline_exceeded());
        assert!(err.last_error().is_none());
        assert_eq!(err.into_source(), None);
    }

    #[test]
    fn test_not_retryable_keeps_error() {
        let err = RetryError::NotRetryable {
            attempt: 2,
            source: Refused,
        };

        assert_eq!(err.attempts(), 2);
        assert!(!err.is_exhausted());
        assert_eq!(err.last_error(), Some(&Refused));
    }
}
