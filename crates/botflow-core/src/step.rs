//! Step trait and the result types produced by running one.

use crate::context::{Context, Payload};
use crate::error::StepError;
use async_trait::async_trait;
use std::fmt::{self, Debug};
use std::time::{Duration, Instant};

/// Type-safe step name wrapper.
///
/// Step names double as context keys: a successful step's payload is
/// stored in the shared context under its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepName(String);

impl StepName {
    /// Creates a new StepName.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a StepName from a type's name (extracts the last segment).
    pub fn from_type_name<T: ?Sized>() -> Self {
        let full_name = std::any::type_name::<T>();
        let short_name = full_name.split("::").last().unwrap_or("UnnamedStep");
        Self::new(short_name)
    }

    /// Returns the step name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the name, returning the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for StepName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A unit of automation work executed by a flow.
///
/// Implementors supply [`execute`](Step::execute); everything else has a
/// default. A step may be invoked several times under a retry policy, so
/// per-invocation state belongs in interior-mutable fields (`AtomicU32`,
/// `Mutex`, ...).
///
/// # Examples
///
/// ```
/// use botflow_core::{payload, Context, Payload, Step, StepError};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct LoginStep;
///
/// #[async_trait]
/// impl Step for LoginStep {
///     async fn execute(&self, ctx: &mut Context) -> Result<Option<Payload>, StepError> {
///         ctx.insert("authenticated", true);
///         Ok(Some(payload("admin".to_string())))
///     }
/// }
/// ```
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Executes the step logic against the shared context.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(payload))` - success; the payload is merged into the
    ///   context under this step's name
    /// - `Ok(None)` - success with nothing to merge
    /// - `Err(error)` - the step failed (may trigger a retry)
    async fn execute(&self, ctx: &mut Context) -> Result<Option<Payload>, StepError>;

    /// Returns the step name.
    ///
    /// Defaults to the implementing type's name. Overrides must return a
    /// non-empty name.
    fn name(&self) -> StepName {
        StepName::from_type_name::<Self>()
    }

    /// Optional human-readable description of the step.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Returns `true` if the step should be skipped for this run.
    ///
    /// Evaluated once per step, before any hooks or plugin events fire.
    fn should_skip(&self, _ctx: &Context) -> bool {
        false
    }

    /// Runs [`execute`](Step::execute) once, measuring its wall-clock time.
    ///
    /// The duration covers only this single raw invocation; retry
    /// bookkeeping around it is not included.
    async fn execute_timed(
        &self,
        ctx: &mut Context,
    ) -> Result<(Option<Payload>, Duration), StepError> {
        let started = Instant::now();
        let payload = self.execute(ctx).await?;
        Ok((payload, started.elapsed()))
    }
}

/// Outcome of one step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The step completed and may have produced a payload.
    Success,
    /// The step failed after its retry budget was spent.
    Failure,
    /// The step's skip predicate short-circuited execution.
    Skipped,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Success => write!(f, "success"),
            StepStatus::Failure => write!(f, "failure"),
            StepStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Terminal snapshot of one step execution.
///
/// Exactly one of `payload` / `error` is present unless the status is
/// [`StepStatus::Skipped`], in which case both are absent.
#[derive(Clone)]
pub struct StepResult {
    /// Outcome of the execution.
    pub status: StepStatus,
    /// Step output, present only on success.
    pub payload: Option<Payload>,
    /// Terminal error, present only on failure.
    pub error: Option<StepError>,
    /// Wall-clock time of the invocation that determined the outcome.
    /// Zero for failures and skips.
    pub duration: Duration,
    /// Attempt count reported for the execution (>= 1).
    pub attempts: u32,
    /// Free-text note about the outcome.
    pub message: String,
}

impl StepResult {
    /// Builds a success result.
    pub fn success(payload: Option<Payload>, duration: Duration, attempts: u32) -> Self {
        Self {
            status: StepStatus::Success,
            payload,
            error: None,
            duration,
            attempts,
            message: String::new(),
        }
    }

    /// Builds a failure result carrying the terminal error.
    pub fn failure(error: StepError, attempts: u32) -> Self {
        let message = error.to_string();
        Self {
            status: StepStatus::Failure,
            payload: None,
            error: Some(error),
            duration: Duration::ZERO,
            attempts,
            message,
        }
    }

    /// Builds a skipped result.
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Skipped,
            payload: None,
            error: None,
            duration: Duration::ZERO,
            attempts: 1,
            message: message.into(),
        }
    }

    /// Returns `true` if the step succeeded.
    pub fn succeeded(&self) -> bool {
        self.status == StepStatus::Success
    }

    /// Downcasts the payload to a concrete type.
    pub fn payload_as<T: std::any::Any + Send + Sync>(&self) -> Option<&T> {
        self.payload
            .as_ref()
            .and_then(|p| p.as_ref().downcast_ref::<T>())
    }
}

impl fmt::Debug for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepResult")
            .field("status", &self.status)
            .field("attempts", &self.attempts)
            .field("duration", &self.duration)
            .field("error", &self.error)
            .field("message", &self.message)
            .finish()
    }
}
