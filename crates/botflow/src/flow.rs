//! Flow: ordered step execution with retries, hooks, and plugins.

use crate::hooks::HookManager;
use crate::plugins::{Plugin, PluginManager};
use crate::retry::{execute_with_retry, RetryFailure};
use crate::{Context, FlowError, RetryPolicy, Step, StepError, StepResult};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Sequential orchestrator of automation steps.
///
/// Steps run one at a time, in registration order, against a shared
/// [`Context`]. Configuration is fluent; every builder-style method
/// consumes and returns the flow.
///
/// # Examples
///
/// ```rust,ignore
/// use botflow::prelude::*;
///
/// let flow = Flow::new("daily report")
///     .step(LoginStep)
///     .step_with_retry(DownloadStep, RetryPolicy::exponential(3, Duration::from_millis(100)))
///     .step(SendEmailStep);
///
/// let results = flow.run().await?;
/// ```
pub struct Flow {
    name: String,
    stop_on_failure: bool,
    report_actual_attempts: bool,
    default_retry: Option<RetryPolicy>,
    hooks: HookManager,
    plugins: PluginManager,
    steps: Vec<(Box<dyn Step>, Option<RetryPolicy>)>,
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("name", &self.name)
            .field(
                "steps",
                &self.steps.iter().map(|(s, _)| s.name()).collect::<Vec<_>>(),
            )
            .field("stop_on_failure", &self.stop_on_failure)
            .finish()
    }
}

impl Flow {
    /// Creates an empty flow with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stop_on_failure: true,
            report_actual_attempts: false,
            default_retry: None,
            hooks: HookManager::new(),
            plugins: PluginManager::new(),
            steps: Vec::new(),
        }
    }

    /// Returns the flow name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of configured steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if no steps are configured.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Appends a step. It runs under the flow's default retry policy, if
    /// any.
    pub fn step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push((Box::new(step), None));
        self
    }

    /// Appends a step with its own retry policy, overriding the default.
    pub fn step_with_retry(mut self, step: impl Step + 'static, policy: RetryPolicy) -> Self {
        self.steps.push((Box::new(step), Some(policy)));
        self
    }

    /// Sets the retry policy applied to every step without an override.
    pub fn default_retry(mut self, policy: RetryPolicy) -> Self {
        self.default_retry = Some(policy);
        self
    }

    /// Controls whether a step failure ends the run (default `true`).
    pub fn stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = stop;
        self
    }

    /// Reports the true number of calls made on a terminal failure instead
    /// of the policy's configured `max_attempts` (default `false`).
    ///
    /// The two differ when error-kind filtering stops retrying before the
    /// attempt budget is spent.
    pub fn report_actual_attempts(mut self, enabled: bool) -> Self {
        self.report_actual_attempts = enabled;
        self
    }

    /// Registers a plugin. Dispatch follows registration order.
    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.register(plugin);
        self
    }

    /// Registers a callback invoked before each step executes.
    pub fn before_step<F>(mut self, hook: F) -> Self
    where
        F: Fn(&dyn Step, &mut Context) -> Result<(), StepError> + Send + Sync + 'static,
    {
        self.hooks.register_before(hook);
        self
    }

    /// Registers a callback invoked after each step's result is built.
    pub fn after_step<F>(mut self, hook: F) -> Self
    where
        F: Fn(&dyn Step, &StepResult, &mut Context) -> Result<(), StepError> + Send + Sync + 'static,
    {
        self.hooks.register_after(hook);
        self
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Executes all steps in order against a fresh context.
    pub async fn run(&self) -> Result<Vec<StepResult>, FlowError> {
        let mut ctx = Context::new();
        self.execute(&mut ctx).await
    }

    /// Executes all steps in order against the given context.
    ///
    /// Returns one [`StepResult`] per step, in configuration order. A
    /// successful step's payload is merged into the context under the
    /// step's name.
    ///
    /// # Errors
    ///
    /// - [`FlowError::StepFailed`] when a step fails and the flow stops on
    ///   failure.
    /// - [`FlowError::Hook`] / [`FlowError::Plugin`] when a callback
    ///   fails; the run aborts without a result for the current step.
    pub async fn execute(&self, ctx: &mut Context) -> Result<Vec<StepResult>, FlowError> {
        let run_id = Uuid::new_v4();
        let mut results = Vec::with_capacity(self.steps.len());

        info!(
            flow = %self.name,
            run_id = %run_id,
            total_steps = self.steps.len(),
            "starting flow"
        );
        self.plugins.flow_start(self)?;

        for (index, (step, retry_override)) in self.steps.iter().enumerate() {
            let index = index + 1;
            let policy = retry_override.as_ref().or(self.default_retry.as_ref());

            if step.should_skip(ctx) {
                info!(run_id = %run_id, step = %step.name(), index, "step skipped");
                results.push(StepResult::skipped(format!(
                    "step '{}' skipped by condition",
                    step.name()
                )));
                continue;
            }

            self.hooks.dispatch_before(step.as_ref(), ctx)?;
            self.plugins.step_start(step.as_ref(), ctx)?;
            info!(run_id = %run_id, step = %step.name(), index, "executing step");

            let result = self.run_step(step.as_ref(), policy, ctx).await?;

            self.hooks.dispatch_after(step.as_ref(), &result, ctx)?;
            self.plugins.step_end(step.as_ref(), &result, ctx)?;

            if result.succeeded() {
                info!(
                    run_id = %run_id,
                    step = %step.name(),
                    duration_ms = result.duration.as_millis() as u64,
                    attempts = result.attempts,
                    "step completed"
                );
                if let Some(payload) = &result.payload {
                    ctx.insert_payload(step.name(), Arc::clone(payload));
                }
            } else {
                error!(
                    run_id = %run_id,
                    step = %step.name(),
                    error = %result.message,
                    attempts = result.attempts,
                    "step failed"
                );
                if self.stop_on_failure {
                    let failing = result.clone();
                    results.push(result);
                    self.plugins.flow_end(self, &results)?;
                    return Err(FlowError::StepFailed {
                        step: step.name(),
                        result: failing,
                    });
                }
            }
            results.push(result);
        }

        self.plugins.flow_end(self, &results)?;
        info!(
            flow = %self.name,
            run_id = %run_id,
            steps_executed = results.len(),
            "flow finished"
        );
        Ok(results)
    }

    async fn run_step(
        &self,
        step: &dyn Step,
        policy: Option<&RetryPolicy>,
        ctx: &mut Context,
    ) -> Result<StepResult, FlowError> {
        let outcome = match policy {
            Some(policy) => execute_with_retry(step, policy, ctx).await,
            None => match step.execute_timed(ctx).await {
                Ok((payload, duration)) => Ok((payload, duration, 1)),
                Err(error) => Err(RetryFailure { error, attempts: 1 }),
            },
        };

        match outcome {
            Ok((payload, duration, attempts)) => {
                Ok(StepResult::success(payload, duration, attempts))
            }
            Err(failure) => {
                self.plugins.step_fail(step, &failure.error, ctx)?;
                let attempts = if self.report_actual_attempts {
                    failure.attempts
                } else {
                    policy.map_or(1, RetryPolicy::max_attempts)
                };
                Ok(StepResult::failure(failure.error, attempts))
            }
        }
    }
}
