//! Retry-driven execution of a single step.

use crate::{Context, Payload, RetryPolicy, Step, StepError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Terminal failure of a retry-driven execution.
///
/// Carries the last recorded error and the number of calls actually made,
/// which can be fewer than the policy's `max_attempts` when error-kind
/// filtering stopped the loop early.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct RetryFailure {
    /// The last error recorded before the loop stopped.
    pub error: StepError,
    /// Number of executive calls made.
    pub attempts: u32,
}

/// Executes `step` under `policy`, retrying failed attempts.
///
/// For each attempt from 1 to `max_attempts`: invoke the step once (timed);
/// on success return the payload, the attempt's own duration, and the
/// attempt number. On failure, stop immediately if the policy declines a
/// retry (attempt budget spent, or the error kind is not retryable);
/// otherwise sleep `compute_wait(attempt)` and continue. The last failing
/// attempt never sleeps.
pub async fn execute_with_retry(
    step: &dyn Step,
    policy: &RetryPolicy,
    ctx: &mut Context,
) -> Result<(Option<Payload>, Duration, u32), RetryFailure> {
    let mut last_error = StepError::other("no attempts were made");
    let mut attempts_made = 0;

    for attempt in 1..=policy.max_attempts() {
        attempts_made = attempt;
        match step.execute_timed(ctx).await {
            Ok((payload, duration)) => return Ok((payload, duration, attempt)),
            Err(error) => {
                warn!(step = %step.name(), attempt, error = %error, "step attempt failed");
                let retry = policy.should_retry(attempt, &error);
                last_error = error;
                if !retry {
                    break;
                }
                let wait = policy.compute_wait(attempt);
                debug!(
                    step = %step.name(),
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "waiting before retry"
                );
                tokio::time::sleep(wait).await;
            }
        }
    }

    Err(RetryFailure {
        error: last_error,
        attempts: attempts_made,
    })
}
