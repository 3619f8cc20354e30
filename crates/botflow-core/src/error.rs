//! Error types for steps, callbacks, and flow execution.

use crate::step::{StepName, StepResult};
use thiserror::Error;

/// Coarse classification of a [`StepError`], used by retry policies to
/// decide whether an error is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input or state failed a check; retrying won't help.
    Validation,
    /// A remote peer or service misbehaved.
    Network,
    /// An operation took too long.
    Timeout,
    /// Filesystem or OS-level I/O failed.
    Io,
    /// Anything else.
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Io => write!(f, "io"),
            ErrorKind::Other => write!(f, "other"),
        }
    }
}

/// Error raised by user code: a step's `execute`, a hook, or a plugin
/// callback.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum StepError {
    /// Input or state failed a check.
    #[error("validation error: {0}")]
    Validation(String),

    /// A remote peer or service misbehaved.
    #[error("network error: {0}")]
    Network(String),

    /// An operation took too long.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Filesystem or OS-level I/O failed.
    #[error("i/o error: {0}")]
    Io(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl StepError {
    /// Creates a validation error.
    pub fn validation(details: impl Into<String>) -> Self {
        StepError::Validation(details.into())
    }

    /// Creates a network error.
    pub fn network(details: impl Into<String>) -> Self {
        StepError::Network(details.into())
    }

    /// Creates a timeout error.
    pub fn timeout(details: impl Into<String>) -> Self {
        StepError::Timeout(details.into())
    }

    /// Creates an I/O error.
    pub fn io(details: impl Into<String>) -> Self {
        StepError::Io(details.into())
    }

    /// Creates an uncategorized error.
    pub fn other(details: impl Into<String>) -> Self {
        StepError::Other(details.into())
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::Validation(_) => ErrorKind::Validation,
            StepError::Network(_) => ErrorKind::Network,
            StepError::Timeout(_) => ErrorKind::Timeout,
            StepError::Io(_) => ErrorKind::Io,
            StepError::Other(_) => ErrorKind::Other,
        }
    }
}

impl From<std::io::Error> for StepError {
    fn from(err: std::io::Error) -> Self {
        StepError::Io(err.to_string())
    }
}

/// The hook that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    /// A before-step hook.
    Before,
    /// An after-step hook.
    After,
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookPhase::Before => write!(f, "before_step"),
            HookPhase::After => write!(f, "after_step"),
        }
    }
}

/// The plugin lifecycle event during which a plugin failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginEvent {
    /// Before the first step of a flow run.
    FlowStart,
    /// After the last step of a flow run, or on a stop-on-failure exit.
    FlowEnd,
    /// Before a step executes.
    StepStart,
    /// After a step's result is built.
    StepEnd,
    /// When a step's execution ends in a terminal error.
    StepFail,
}

impl std::fmt::Display for PluginEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginEvent::FlowStart => write!(f, "flow_start"),
            PluginEvent::FlowEnd => write!(f, "flow_end"),
            PluginEvent::StepStart => write!(f, "step_start"),
            PluginEvent::StepEnd => write!(f, "step_end"),
            PluginEvent::StepFail => write!(f, "step_fail"),
        }
    }
}

fn failure_cause(result: &StepResult) -> String {
    match &result.error {
        Some(error) => error.to_string(),
        None => "unknown error".to_string(),
    }
}

/// Errors that can end a flow run.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FlowError {
    /// A step failed and the flow is configured to stop on failure.
    #[error("step '{step}' failed after {} attempt(s): {}", .result.attempts, failure_cause(.result))]
    StepFailed {
        /// The step that failed.
        step: StepName,
        /// The step's terminal result.
        result: StepResult,
    },

    /// A before/after hook returned an error, aborting the run.
    #[error("hook ({phase}) failed for step '{step}': {details}")]
    Hook {
        /// The step whose hook failed.
        step: StepName,
        /// Which hook list was being dispatched.
        phase: HookPhase,
        /// Details about the failure.
        details: String,
    },

    /// A plugin callback returned an error, aborting the run.
    #[error("plugin '{plugin}' failed during {event}: {details}")]
    Plugin {
        /// The plugin that failed.
        plugin: String,
        /// The lifecycle event being dispatched.
        event: PluginEvent,
        /// Details about the failure.
        details: String,
    },
}
