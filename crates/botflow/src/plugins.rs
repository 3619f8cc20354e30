//! Plugin lifecycle observers and their dispatcher.

use crate::flow::Flow;
use crate::{Context, FlowError, PluginEvent, Step, StepError, StepResult};

/// Observer of flow-level and step-level lifecycle events.
///
/// Every method defaults to a no-op; implement only the events you care
/// about. Plugins run synchronously inline with the flow, so state shared
/// across callbacks belongs in interior-mutable fields.
///
/// # Examples
///
/// ```
/// use botflow::{Flow, Plugin, StepError, StepResult};
///
/// struct ResultCounter;
///
/// impl Plugin for ResultCounter {
///     fn on_flow_end(&self, _flow: &Flow, results: &[StepResult]) -> Result<(), StepError> {
///         println!("{} step(s) ran", results.len());
///         Ok(())
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    /// Returns the plugin name, used in logs and error messages.
    ///
    /// Defaults to the implementing type's name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or("plugin")
    }

    /// Called once before the first step of a run.
    fn on_flow_start(&self, _flow: &Flow) -> Result<(), StepError> {
        Ok(())
    }

    /// Called once when a run ends, on both the success exit and the
    /// stop-on-failure exit.
    fn on_flow_end(&self, _flow: &Flow, _results: &[StepResult]) -> Result<(), StepError> {
        Ok(())
    }

    /// Called before each step executes (skipped steps excluded).
    fn on_step_start(&self, _step: &dyn Step, _ctx: &mut Context) -> Result<(), StepError> {
        Ok(())
    }

    /// Called after each step's result is built, success or failure.
    fn on_step_end(
        &self,
        _step: &dyn Step,
        _result: &StepResult,
        _ctx: &mut Context,
    ) -> Result<(), StepError> {
        Ok(())
    }

    /// Called once with the terminal error when a step's execution fails,
    /// before the failure result is built.
    fn on_step_fail(
        &self,
        _step: &dyn Step,
        _error: &StepError,
        _ctx: &mut Context,
    ) -> Result<(), StepError> {
        Ok(())
    }
}

/// Ordered registry dispatching lifecycle events to every plugin.
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginManager {
    /// Creates an empty plugin manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin. Dispatch follows registration order.
    pub fn register(&mut self, plugin: impl Plugin + 'static) {
        self.plugins.push(Box::new(plugin));
    }

    /// Returns the number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` if no plugins are registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Dispatches the flow-start event.
    pub fn flow_start(&self, flow: &Flow) -> Result<(), FlowError> {
        for plugin in &self.plugins {
            plugin
                .on_flow_start(flow)
                .map_err(|e| wrap(plugin.as_ref(), PluginEvent::FlowStart, e))?;
        }
        Ok(())
    }

    /// Dispatches the flow-end event.
    pub fn flow_end(&self, flow: &Flow, results: &[StepResult]) -> Result<(), FlowError> {
        for plugin in &self.plugins {
            plugin
                .on_flow_end(flow, results)
                .map_err(|e| wrap(plugin.as_ref(), PluginEvent::FlowEnd, e))?;
        }
        Ok(())
    }

    /// Dispatches the step-start event.
    pub fn step_start(&self, step: &dyn Step, ctx: &mut Context) -> Result<(), FlowError> {
        for plugin in &self.plugins {
            plugin
                .on_step_start(step, ctx)
                .map_err(|e| wrap(plugin.as_ref(), PluginEvent::StepStart, e))?;
        }
        Ok(())
    }

    /// Dispatches the step-end event.
    pub fn step_end(
        &self,
        step: &dyn Step,
        result: &StepResult,
        ctx: &mut Context,
    ) -> Result<(), FlowError> {
        for plugin in &self.plugins {
            plugin
                .on_step_end(step, result, ctx)
                .map_err(|e| wrap(plugin.as_ref(), PluginEvent::StepEnd, e))?;
        }
        Ok(())
    }

    /// Dispatches the step-fail event.
    pub fn step_fail(
        &self,
        step: &dyn Step,
        error: &StepError,
        ctx: &mut Context,
    ) -> Result<(), FlowError> {
        for plugin in &self.plugins {
            plugin
                .on_step_fail(step, error, ctx)
                .map_err(|e| wrap(plugin.as_ref(), PluginEvent::StepFail, e))?;
        }
        Ok(())
    }
}

fn wrap(plugin: &dyn Plugin, event: PluginEvent, error: StepError) -> FlowError {
    FlowError::Plugin {
        plugin: plugin.name().to_string(),
        event,
        details: error.to_string(),
    }
}
