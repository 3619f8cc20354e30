//! Before/after hook registry for step execution.

use crate::{Context, FlowError, HookPhase, Step, StepError, StepResult};

type BeforeHook = Box<dyn Fn(&dyn Step, &mut Context) -> Result<(), StepError> + Send + Sync>;
type AfterHook =
    Box<dyn Fn(&dyn Step, &StepResult, &mut Context) -> Result<(), StepError> + Send + Sync>;

/// Ordered registry of before-step and after-step callbacks.
///
/// Registration preserves insertion order and dispatch is synchronous in
/// that order. The first callback error aborts the remaining callbacks and
/// the step that triggered the dispatch.
#[derive(Default)]
pub struct HookManager {
    before: Vec<BeforeHook>,
    after: Vec<AfterHook>,
}

impl HookManager {
    /// Creates an empty hook manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback invoked before each step executes.
    pub fn register_before<F>(&mut self, hook: F)
    where
        F: Fn(&dyn Step, &mut Context) -> Result<(), StepError> + Send + Sync + 'static,
    {
        self.before.push(Box::new(hook));
    }

    /// Registers a callback invoked after each step's result is built.
    pub fn register_after<F>(&mut self, hook: F)
    where
        F: Fn(&dyn Step, &StepResult, &mut Context) -> Result<(), StepError> + Send + Sync + 'static,
    {
        self.after.push(Box::new(hook));
    }

    /// Dispatches all before-step hooks in registration order.
    pub fn dispatch_before(&self, step: &dyn Step, ctx: &mut Context) -> Result<(), FlowError> {
        for hook in &self.before {
            hook(step, ctx).map_err(|error| FlowError::Hook {
                step: step.name(),
                phase: HookPhase::Before,
                details: error.to_string(),
            })?;
        }
        Ok(())
    }

    /// Dispatches all after-step hooks in registration order.
    pub fn dispatch_after(
        &self,
        step: &dyn Step,
        result: &StepResult,
        ctx: &mut Context,
    ) -> Result<(), FlowError> {
        for hook in &self.after {
            hook(step, result, ctx).map_err(|error| FlowError::Hook {
                step: step.name(),
                phase: HookPhase::After,
                details: error.to_string(),
            })?;
        }
        Ok(())
    }
}
