//! Retry policies: how often and how long to wait when a step fails.

use crate::error::{ErrorKind, StepError};
use std::time::Duration;

/// Pluggable backoff and retry-eligibility algorithm.
///
/// `max_attempts` bounds the number of executive calls, not the number of
/// waits; a failing last attempt does not sleep. The retryable set defaults
/// to every [`ErrorKind`]; restrict it with [`retry_on`](RetryPolicy::retry_on).
///
/// # Examples
///
/// ```
/// use botflow_core::{ErrorKind, RetryPolicy};
/// use std::time::Duration;
///
/// // Three calls at most, one second apart.
/// let policy = RetryPolicy::fixed(3, Duration::from_secs(1));
///
/// // Five calls, doubling waits from 500ms, only for timeouts.
/// let policy = RetryPolicy::exponential(5, Duration::from_millis(500))
///     .retry_on([ErrorKind::Timeout]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Constant wait between attempts.
    FixedDelay {
        /// Maximum number of executive calls (>= 1).
        max_attempts: u32,
        /// Wait between attempts.
        wait: Duration,
        /// Error kinds worth retrying; `None` means all.
        retry_on: Option<Vec<ErrorKind>>,
    },
    /// Exponentially growing wait with an optional jitter term.
    ExponentialBackoff {
        /// Maximum number of executive calls (>= 1).
        max_attempts: u32,
        /// Base of the exponential term.
        base: Duration,
        /// Cap applied to the jittered wait.
        max_wait: Duration,
        /// Adds a uniform term in `[0, 0.1 * exponential)` before capping.
        jitter: bool,
        /// Error kinds worth retrying; `None` means all.
        retry_on: Option<Vec<ErrorKind>>,
    },
}

/// Error returned when [`RetryPolicy`] configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicyError(pub &'static str);

impl std::fmt::Display for RetryPolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RetryPolicyError {}

impl RetryPolicy {
    /// Creates a fixed-delay policy.
    pub fn fixed(max_attempts: u32, wait: Duration) -> Self {
        RetryPolicy::FixedDelay {
            max_attempts,
            wait,
            retry_on: None,
        }
    }

    /// Creates an exponential backoff policy with default settings
    /// (`max_wait` of 60 seconds, jitter on).
    pub fn exponential(max_attempts: u32, base: Duration) -> Self {
        RetryPolicy::ExponentialBackoff {
            max_attempts,
            base,
            max_wait: Duration::from_secs(60),
            jitter: true,
            retry_on: None,
        }
    }

    /// Creates an exponential backoff policy with custom settings.
    ///
    /// # Errors
    ///
    /// Returns [`RetryPolicyError`] if `max_attempts` is zero or
    /// `max_wait` is less than `base`.
    pub fn exponential_backoff(
        max_attempts: u32,
        base: Duration,
        max_wait: Duration,
        jitter: bool,
    ) -> Result<Self, RetryPolicyError> {
        if max_attempts == 0 {
            return Err(RetryPolicyError("max_attempts must be at least 1"));
        }
        if max_wait < base {
            return Err(RetryPolicyError("max_wait must be >= base"));
        }
        Ok(RetryPolicy::ExponentialBackoff {
            max_attempts,
            base,
            max_wait,
            jitter,
            retry_on: None,
        })
    }

    /// Restricts the policy to the given error kinds.
    pub fn retry_on(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        match &mut self {
            RetryPolicy::FixedDelay { retry_on, .. }
            | RetryPolicy::ExponentialBackoff { retry_on, .. } => {
                *retry_on = Some(kinds.into_iter().collect());
            }
        }
        self
    }

    /// Returns the maximum number of executive calls for this policy.
    pub fn max_attempts(&self) -> u32 {
        match self {
            RetryPolicy::FixedDelay { max_attempts, .. }
            | RetryPolicy::ExponentialBackoff { max_attempts, .. } => *max_attempts,
        }
    }

    /// Calculates the wait after the given attempt (1-based).
    ///
    /// # Examples
    ///
    /// ```
    /// use botflow_core::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::exponential_backoff(
    ///     5,
    ///     Duration::from_secs(1),
    ///     Duration::from_secs(60),
    ///     false,
    /// )?;
    ///
    /// assert_eq!(policy.compute_wait(1), Duration::from_secs(2));
    /// assert_eq!(policy.compute_wait(2), Duration::from_secs(4));
    /// assert_eq!(policy.compute_wait(3), Duration::from_secs(8));
    /// # Ok::<(), botflow_core::RetryPolicyError>(())
    /// ```
    pub fn compute_wait(&self, attempt: u32) -> Duration {
        match self {
            RetryPolicy::FixedDelay { wait, .. } => *wait,
            RetryPolicy::ExponentialBackoff {
                base,
                max_wait,
                jitter,
                ..
            } => {
                let mut wait = base.as_secs_f64() * 2f64.powi(attempt as i32);
                if *jitter && wait > 0.0 {
                    use rand::Rng;
                    wait += rand::thread_rng().gen_range(0.0..wait * 0.1);
                }
                Duration::from_secs_f64(wait.min(max_wait.as_secs_f64()))
            }
        }
    }

    /// Returns `true` if another attempt should be made after `attempt`
    /// (1-based) failed with `error`.
    pub fn should_retry(&self, attempt: u32, error: &StepError) -> bool {
        if attempt >= self.max_attempts() {
            return false;
        }
        self.retries_kind(error.kind())
    }

    fn retries_kind(&self, kind: ErrorKind) -> bool {
        let retry_on = match self {
            RetryPolicy::FixedDelay { retry_on, .. }
            | RetryPolicy::ExponentialBackoff { retry_on, .. } => retry_on,
        };
        match retry_on {
            None => true,
            Some(kinds) => kinds.contains(&kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_wait_is_constant() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(5));
        assert_eq!(policy.compute_wait(1), Duration::from_secs(5));
        assert_eq!(policy.compute_wait(2), Duration::from_secs(5));
    }

    #[test]
    fn test_fixed_should_retry_bounds() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(1));
        let error = StepError::other("boom");
        assert!(policy.should_retry(1, &error));
        assert!(policy.should_retry(2, &error));
        assert!(!policy.should_retry(3, &error));
        assert!(!policy.should_retry(4, &error));
    }

    #[test]
    fn test_exponential_grows() {
        let policy = RetryPolicy::exponential_backoff(
            5,
            Duration::from_secs(1),
            Duration::from_secs(60),
            false,
        )
        .expect("valid policy");
        assert_eq!(policy.compute_wait(1), Duration::from_secs(2));
        assert_eq!(policy.compute_wait(2), Duration::from_secs(4));
        assert_eq!(policy.compute_wait(3), Duration::from_secs(8));
    }

    #[test]
    fn test_exponential_respects_cap() {
        let policy = RetryPolicy::exponential_backoff(
            5,
            Duration::from_secs(10),
            Duration::from_secs(15),
            false,
        )
        .expect("valid policy");
        assert_eq!(policy.compute_wait(5), Duration::from_secs(15));
    }

    #[test]
    fn test_jitter_never_exceeds_cap() {
        let policy = RetryPolicy::exponential_backoff(
            5,
            Duration::from_secs(1),
            Duration::from_secs(100),
            true,
        )
        .expect("valid policy");
        for attempt in 1..=5 {
            let unjittered = Duration::from_secs_f64(1.0 * 2f64.powi(attempt));
            let wait = policy.compute_wait(attempt as u32);
            assert!(wait >= unjittered);
            assert!(wait <= Duration::from_secs(100));
        }
    }

    #[test]
    fn test_kind_filtering() {
        let policy =
            RetryPolicy::fixed(5, Duration::ZERO).retry_on([ErrorKind::Timeout]);
        assert!(policy.should_retry(1, &StepError::timeout("slow")));
        assert!(!policy.should_retry(1, &StepError::validation("bad input")));
    }

    #[test]
    fn test_exponential_backoff_validation() {
        let result = RetryPolicy::exponential_backoff(
            0,
            Duration::from_millis(100),
            Duration::from_secs(10),
            false,
        );
        assert!(result.is_err());

        let result = RetryPolicy::exponential_backoff(
            3,
            Duration::from_secs(10),
            Duration::from_millis(100),
            false,
        );
        assert_eq!(
            result,
            Err(RetryPolicyError("max_wait must be >= base"))
        );
    }
}
