//! A sequential automation orchestrator.
//!
//! Botflow executes an ordered list of steps one at a time against a
//! shared mutable [`Context`], applying per-step retry policies, lifecycle
//! hooks, and plugin callbacks, stopping or continuing on failure per
//! configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use botflow::prelude::*;
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct LoginStep;
//!
//! #[async_trait]
//! impl Step for LoginStep {
//!     async fn execute(&self, ctx: &mut Context) -> Result<Option<Payload>, StepError> {
//!         ctx.insert("user", "admin".to_string());
//!         Ok(None)
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct DownloadStep;
//!
//! #[async_trait]
//! impl Step for DownloadStep {
//!     async fn execute(&self, _ctx: &mut Context) -> Result<Option<Payload>, StepError> {
//!         Ok(Some(payload("report.csv".to_string())))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), FlowError> {
//!     let flow = Flow::new("daily report")
//!         .step(LoginStep)
//!         .step_with_retry(
//!             DownloadStep,
//!             RetryPolicy::exponential(3, Duration::from_millis(100)),
//!         );
//!
//!     let results = flow.run().await?;
//!     assert!(results.iter().all(|r| r.succeeded()));
//!     Ok(())
//! }
//! ```

mod flow;
mod hooks;
mod plugins;
mod retry;

// Re-export core types
pub use botflow_core::*;

pub use flow::Flow;
pub use hooks::HookManager;
pub use plugins::{Plugin, PluginManager};
pub use retry::{execute_with_retry, RetryFailure};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        payload, Context, ContextKey, ErrorKind, Flow, FlowError, HookManager, HookPhase,
        Payload, Plugin, PluginEvent, PluginManager, RetryPolicy, RetryPolicyError, Step,
        StepError, StepName, StepResult, StepStatus,
    };
}
