//! Core traits and types for the botflow orchestrator.
//!
//! This crate provides runtime-free abstractions. Library authors should
//! depend on this crate to implement custom steps.
//!
//! # Core Types
//!
//! - [`Step`] - The unit-of-work trait for flow steps
//! - [`StepResult`] / [`StepStatus`] - Terminal snapshot of one execution
//! - [`Context`] - Shared key-value store mutated across steps
//! - [`RetryPolicy`] - Backoff and retry-eligibility algorithms
//! - [`StepError`] / [`FlowError`] - Error types for steps and flow runs

mod context;
mod error;
mod retry;
mod step;

pub use context::{payload, Context, ContextKey, Payload};
pub use error::{ErrorKind, FlowError, HookPhase, PluginEvent, StepError};
pub use retry::{RetryPolicy, RetryPolicyError};
pub use step::{Step, StepName, StepResult, StepStatus};
