use async_trait::async_trait;
use botflow::prelude::*;
use botflow::execute_with_retry;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug)]
struct OkStep;

#[async_trait]
impl Step for OkStep {
    async fn execute(&self, _ctx: &mut Context) -> Result<Option<Payload>, StepError> {
        Ok(Some(payload(true)))
    }
}

#[derive(Debug)]
struct BadStep;

#[async_trait]
impl Step for BadStep {
    async fn execute(&self, _ctx: &mut Context) -> Result<Option<Payload>, StepError> {
        Err(StepError::other("deliberate failure"))
    }
}

#[derive(Debug)]
struct SkippedStep;

#[async_trait]
impl Step for SkippedStep {
    async fn execute(&self, _ctx: &mut Context) -> Result<Option<Payload>, StepError> {
        Ok(None)
    }

    fn should_skip(&self, _ctx: &Context) -> bool {
        true
    }
}

/// Fails until `succeed_on`, then returns its own call count.
struct CountingStep {
    calls: Arc<AtomicU32>,
    succeed_on: u32,
    error: StepError,
}

impl CountingStep {
    fn new(calls: Arc<AtomicU32>, succeed_on: u32) -> Self {
        Self {
            calls,
            succeed_on,
            error: StepError::other("not yet"),
        }
    }

    fn failing_with(calls: Arc<AtomicU32>, error: StepError) -> Self {
        Self {
            calls,
            succeed_on: u32::MAX,
            error,
        }
    }
}

impl std::fmt::Debug for CountingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingStep").finish()
    }
}

#[async_trait]
impl Step for CountingStep {
    async fn execute(&self, _ctx: &mut Context) -> Result<Option<Payload>, StepError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call < self.succeed_on {
            Err(self.error.clone())
        } else {
            Ok(Some(payload(call)))
        }
    }

    fn name(&self) -> StepName {
        StepName::new("Counting")
    }
}

// ── Flow execution ─────────────────────────────────────────────────────────

#[tokio::test]
async fn one_result_per_step_in_order() {
    let flow = Flow::new("keep going")
        .stop_on_failure(false)
        .step(OkStep)
        .step(BadStep)
        .step(OkStep);

    let results = flow.run().await.expect("flow should not stop");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].status, StepStatus::Success);
    assert_eq!(results[1].status, StepStatus::Failure);
    assert_eq!(results[2].status, StepStatus::Success);
}

#[tokio::test]
async fn stop_on_failure_halts_at_first_failure() {
    let calls = Arc::new(AtomicU32::new(0));
    let trailing = CountingStep::new(calls.clone(), 1);

    let flow = Flow::new("halt").step(OkStep).step(BadStep).step(trailing);

    let err = flow.run().await.expect_err("flow should stop");
    match err {
        FlowError::StepFailed { step, result } => {
            assert_eq!(step.as_str(), "BadStep");
            assert_eq!(result.status, StepStatus::Failure);
            assert_eq!(result.attempts, 1);
            assert!(result.error.is_some());
        }
        other => panic!("expected StepFailed, got {other:?}"),
    }
    // The step after the failure never ran.
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn skipped_step_produces_skipped_result() {
    let flow = Flow::new("skip").step(SkippedStep).step(OkStep);

    let results = flow.run().await.expect("flow should succeed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status, StepStatus::Skipped);
    assert!(results[0].payload.is_none());
    assert!(results[0].error.is_none());
    assert_eq!(results[1].status, StepStatus::Success);
}

#[tokio::test]
async fn context_propagates_between_steps() {
    #[derive(Debug)]
    struct Answer {
        value: i32,
    }

    #[derive(Debug)]
    struct StepA;

    #[async_trait]
    impl Step for StepA {
        async fn execute(&self, _ctx: &mut Context) -> Result<Option<Payload>, StepError> {
            Ok(Some(payload(Answer { value: 42 })))
        }

        fn name(&self) -> StepName {
            StepName::new("A")
        }
    }

    #[derive(Debug)]
    struct StepB;

    #[async_trait]
    impl Step for StepB {
        async fn execute(&self, ctx: &mut Context) -> Result<Option<Payload>, StepError> {
            let answer = ctx
                .get::<Answer>("A")
                .ok_or_else(|| StepError::validation("missing upstream payload"))?;
            if answer.value != 42 {
                return Err(StepError::validation("wrong value"));
            }
            Ok(None)
        }

        fn name(&self) -> StepName {
            StepName::new("B")
        }
    }

    let flow = Flow::new("chain").step(StepA).step(StepB);
    let mut ctx = Context::new();
    let results = flow.execute(&mut ctx).await.expect("flow should succeed");

    assert!(results.iter().all(|r| r.succeeded()));
    assert_eq!(ctx.get::<Answer>("A").map(|a| a.value), Some(42));
    // StepB returned no payload, so nothing was stored under its name.
    assert!(!ctx.contains_key("B"));
}

#[tokio::test]
async fn rerun_starts_from_a_fresh_context() {
    let calls = Arc::new(AtomicU32::new(0));
    let flow = Flow::new("rerun").step(CountingStep::new(calls.clone(), 1));

    let first = flow.run().await.expect("first run");
    let second = flow.run().await.expect("second run");

    assert_eq!(first[0].payload_as::<u32>(), Some(&1));
    assert_eq!(second[0].payload_as::<u32>(), Some(&2));
}

// ── Retry ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn retry_succeeds_on_third_attempt() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = CountingStep::new(calls.clone(), 3);

    let flow = Flow::new("retry")
        .step_with_retry(step, RetryPolicy::fixed(5, Duration::ZERO));

    let results = flow.run().await.expect("flow should succeed");

    assert!(results[0].succeeded());
    assert_eq!(results[0].attempts, 3);
    assert_eq!(results[0].payload_as::<u32>(), Some(&3));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_exhaustion_fails_the_flow() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = CountingStep::failing_with(calls.clone(), StepError::other("always"));

    let flow = Flow::new("exhaust")
        .step_with_retry(step, RetryPolicy::fixed(2, Duration::ZERO));

    let err = flow.run().await.expect_err("flow should stop");
    match err {
        FlowError::StepFailed { result, .. } => assert_eq!(result.attempts, 2),
        other => panic!("expected StepFailed, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn default_retry_applies_without_override() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = CountingStep::new(calls.clone(), 2);

    let flow = Flow::new("default retry")
        .default_retry(RetryPolicy::fixed(3, Duration::ZERO))
        .step(step);

    let results = flow.run().await.expect("flow should succeed");
    assert_eq!(results[0].attempts, 2);
}

#[tokio::test]
async fn execute_with_retry_propagates_after_exhaustion() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = CountingStep::failing_with(calls.clone(), StepError::other("always fails"));
    let policy = RetryPolicy::fixed(3, Duration::ZERO);
    let mut ctx = Context::new();

    let failure = execute_with_retry(&step, &policy, &mut ctx)
        .await
        .expect_err("retry should exhaust");

    assert_eq!(failure.error.to_string(), "always fails");
    assert_eq!(failure.attempts, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn execute_with_retry_first_attempt_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = CountingStep::new(calls.clone(), 1);
    let policy = RetryPolicy::fixed(3, Duration::ZERO);
    let mut ctx = Context::new();

    let (payload, _duration, attempts) = execute_with_retry(&step, &policy, &mut ctx)
        .await
        .expect("first attempt should succeed");

    assert_eq!(attempts, 1);
    assert!(payload.is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn kind_filtering_short_circuits_retrying() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = CountingStep::failing_with(calls.clone(), StepError::validation("bad input"));
    let policy = RetryPolicy::fixed(5, Duration::ZERO).retry_on([ErrorKind::Timeout]);

    let flow = Flow::new("filter")
        .stop_on_failure(false)
        .step_with_retry(step, policy);

    let results = flow.run().await.expect("flow should not stop");

    // Only one call was made, but the reported count is the configured
    // ceiling, matching the original behavior.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(results[0].status, StepStatus::Failure);
    assert_eq!(results[0].attempts, 5);
}

#[tokio::test]
async fn actual_attempts_flag_reports_calls_made() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = CountingStep::failing_with(calls.clone(), StepError::validation("bad input"));
    let policy = RetryPolicy::fixed(5, Duration::ZERO).retry_on([ErrorKind::Timeout]);

    let flow = Flow::new("filter")
        .stop_on_failure(false)
        .report_actual_attempts(true)
        .step_with_retry(step, policy);

    let results = flow.run().await.expect("flow should not stop");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(results[0].attempts, 1);
}

// ── Hooks ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn hooks_fire_in_order_around_each_step() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let before_events = events.clone();
    let after_events = events.clone();

    let flow = Flow::new("hooks")
        .before_step(move |step: &dyn Step, _ctx: &mut Context| {
            before_events
                .lock()
                .expect("lock")
                .push(format!("before:{}", step.name()));
            Ok(())
        })
        .after_step(move |step: &dyn Step, result: &StepResult, _ctx: &mut Context| {
            after_events
                .lock()
                .expect("lock")
                .push(format!("after:{}:{}", step.name(), result.status));
            Ok(())
        })
        .step(OkStep);

    flow.run().await.expect("flow should succeed");

    let events = events.lock().expect("lock");
    assert_eq!(
        events.as_slice(),
        ["before:OkStep", "after:OkStep:success"]
    );
}

#[tokio::test]
async fn hook_error_aborts_the_run() {
    let calls = Arc::new(AtomicU32::new(0));
    let step = CountingStep::new(calls.clone(), 1);

    let flow = Flow::new("bad hook")
        .before_step(|_step: &dyn Step, _ctx: &mut Context| {
            Err(StepError::other("hook exploded"))
        })
        .step(step);

    let err = flow.run().await.expect_err("hook failure should abort");
    match err {
        FlowError::Hook { step, phase, details } => {
            assert_eq!(step.as_str(), "Counting");
            assert_eq!(phase, HookPhase::Before);
            assert!(details.contains("hook exploded"));
        }
        other => panic!("expected Hook error, got {other:?}"),
    }
    // The step behind the failing hook never ran.
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn hooks_do_not_fire_for_skipped_steps() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let before_events = events.clone();

    let flow = Flow::new("skip hooks")
        .before_step(move |step: &dyn Step, _ctx: &mut Context| {
            before_events
                .lock()
                .expect("lock")
                .push(step.name().to_string());
            Ok(())
        })
        .step(SkippedStep)
        .step(OkStep);

    flow.run().await.expect("flow should succeed");

    let events = events.lock().expect("lock");
    assert_eq!(events.as_slice(), ["OkStep"]);
}

// ── Plugins ────────────────────────────────────────────────────────────────

struct RecordingPlugin {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingPlugin {
    fn record(&self, event: impl Into<String>) {
        self.events.lock().expect("lock").push(event.into());
    }
}

impl Plugin for RecordingPlugin {
    fn on_flow_start(&self, _flow: &Flow) -> Result<(), StepError> {
        self.record("flow_start");
        Ok(())
    }

    fn on_flow_end(&self, _flow: &Flow, _results: &[StepResult]) -> Result<(), StepError> {
        self.record("flow_end");
        Ok(())
    }

    fn on_step_start(&self, step: &dyn Step, _ctx: &mut Context) -> Result<(), StepError> {
        self.record(format!("step_start:{}", step.name()));
        Ok(())
    }

    fn on_step_end(
        &self,
        step: &dyn Step,
        result: &StepResult,
        _ctx: &mut Context,
    ) -> Result<(), StepError> {
        self.record(format!("step_end:{}:{}", step.name(), result.status));
        Ok(())
    }

    fn on_step_fail(
        &self,
        step: &dyn Step,
        error: &StepError,
        _ctx: &mut Context,
    ) -> Result<(), StepError> {
        self.record(format!("step_fail:{}:{}", step.name(), error));
        Ok(())
    }
}

#[tokio::test]
async fn plugin_sees_full_lifecycle_in_order() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let flow = Flow::new("lifecycle")
        .plugin(RecordingPlugin {
            events: events.clone(),
        })
        .step(OkStep);

    flow.run().await.expect("flow should succeed");

    let events = events.lock().expect("lock");
    assert_eq!(
        events.as_slice(),
        ["flow_start", "step_start:OkStep", "step_end:OkStep:success", "flow_end"]
    );
}

#[tokio::test]
async fn plugin_observes_terminal_failure_once() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::new(AtomicU32::new(0));
    let step = CountingStep::failing_with(calls, StepError::other("boom"));

    let flow = Flow::new("fail events")
        .stop_on_failure(false)
        .plugin(RecordingPlugin {
            events: events.clone(),
        })
        .step_with_retry(step, RetryPolicy::fixed(2, Duration::ZERO));

    flow.run().await.expect("flow should not stop");

    let events = events.lock().expect("lock");
    assert_eq!(
        events.as_slice(),
        [
            "flow_start",
            "step_start:Counting",
            "step_fail:Counting:boom",
            "step_end:Counting:failure",
            "flow_end",
        ]
    );
}

#[tokio::test]
async fn plugin_step_events_do_not_fire_for_skipped_steps() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let flow = Flow::new("skip plugin")
        .plugin(RecordingPlugin {
            events: events.clone(),
        })
        .step(SkippedStep);

    flow.run().await.expect("flow should succeed");

    let events = events.lock().expect("lock");
    assert_eq!(
        events.as_slice(),
        ["flow_start", "flow_end"]
    );
}

#[tokio::test]
async fn flow_end_fires_once_on_stop_on_failure_exit() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let flow = Flow::new("early exit")
        .plugin(RecordingPlugin {
            events: events.clone(),
        })
        .step(BadStep)
        .step(OkStep);

    flow.run().await.expect_err("flow should stop");

    let events = events.lock().expect("lock");
    let flow_ends = events.iter().filter(|e| e.as_str() == "flow_end").count();
    assert_eq!(flow_ends, 1);
    // No step events for the step after the failure.
    assert!(!events.iter().any(|e| e.contains("OkStep")));
}
