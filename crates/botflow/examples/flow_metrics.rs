//! Observing a flow with a metrics plugin and step hooks.

use async_trait::async_trait;
use botflow::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Reports flow duration and per-status counts when the run ends.
struct MetricsPlugin {
    started: Mutex<Option<Instant>>,
}

impl MetricsPlugin {
    fn new() -> Self {
        Self {
            started: Mutex::new(None),
        }
    }
}

impl Plugin for MetricsPlugin {
    fn name(&self) -> &str {
        "metrics"
    }

    fn on_flow_start(&self, flow: &Flow) -> Result<(), StepError> {
        let mut started = self
            .started
            .lock()
            .map_err(|_| StepError::other("metrics clock poisoned"))?;
        *started = Some(Instant::now());
        println!(
            "[metrics] flow '{}' started ({} steps)",
            flow.name(),
            flow.step_count()
        );
        Ok(())
    }

    fn on_flow_end(&self, flow: &Flow, results: &[StepResult]) -> Result<(), StepError> {
        let started = self
            .started
            .lock()
            .map_err(|_| StepError::other("metrics clock poisoned"))?;
        let elapsed = started.map(|t| t.elapsed()).unwrap_or_default();
        let succeeded = results.iter().filter(|r| r.succeeded()).count();
        let skipped = results
            .iter()
            .filter(|r| r.status == StepStatus::Skipped)
            .count();
        println!(
            "[metrics] flow '{}' finished in {:.2?}: {} succeeded, {} skipped, {} total",
            flow.name(),
            elapsed,
            succeeded,
            skipped,
            results.len()
        );
        Ok(())
    }
}

#[derive(Debug)]
struct WarmCacheStep;

#[async_trait]
impl Step for WarmCacheStep {
    async fn execute(&self, ctx: &mut Context) -> Result<Option<Payload>, StepError> {
        ctx.insert("cache_warm", true);
        Ok(None)
    }
}

/// Fails on the first call, succeeds afterwards.
struct FlakyFetchStep {
    calls: AtomicU32,
}

impl std::fmt::Debug for FlakyFetchStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlakyFetchStep").finish()
    }
}

#[async_trait]
impl Step for FlakyFetchStep {
    async fn execute(&self, _ctx: &mut Context) -> Result<Option<Payload>, StepError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(StepError::timeout("upstream took too long"));
        }
        Ok(Some(payload(vec![1u32, 2, 3])))
    }
}

#[derive(Debug)]
struct NightlyCleanupStep;

#[async_trait]
impl Step for NightlyCleanupStep {
    async fn execute(&self, _ctx: &mut Context) -> Result<Option<Payload>, StepError> {
        Ok(None)
    }

    fn should_skip(&self, ctx: &Context) -> bool {
        // Only runs when a previous step asked for it.
        !ctx.contains_key("cleanup_requested")
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let flow = Flow::new("nightly sync")
        .plugin(MetricsPlugin::new())
        .after_step(|step: &dyn Step, result: &StepResult, _ctx: &mut Context| {
            println!("[hook] {} -> {}", step.name(), result.status);
            Ok(())
        })
        .step(WarmCacheStep)
        .step_with_retry(
            FlakyFetchStep {
                calls: AtomicU32::new(0),
            },
            RetryPolicy::fixed(3, Duration::from_millis(50))
                .retry_on([ErrorKind::Timeout, ErrorKind::Network]),
        )
        .step(NightlyCleanupStep);

    let results = flow.run().await?;
    assert_eq!(results.len(), 3);

    Ok(())
}
