use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use agent_config::AgentConfig;
use agent_kernel::{
    AgentError, AgentRuntime, AgentState, BoxError, ChatRuntime, TaskContext, TaskHandler,
};
use agent_memory::ExecutionMemory;
use agent_primitives::{AgentIdentity, BasicTask, TaskPriority};
use agent_telemetry::{ConversationMetrics, OutcomeMetrics};
use async_trait::async_trait;
use proptest::prelude::*;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("intentional failure: {0}")]
struct IntentionalFailure(String);

#[derive(Default)]
struct Scripted {
    processed: Mutex<Vec<String>>,
    started: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    transitions: Mutex<Vec<(AgentState, AgentState)>>,
    fail_on_start: AtomicBool,
    fail_on_pause: AtomicBool,
    fail_on_stop: AtomicBool,
    fail_on_reset: AtomicBool,
    summary: Option<String>,
}

#[async_trait]
impl TaskHandler for Scripted {
    type Task = BasicTask;
    type Output = String;
    type Error = IntentionalFailure;

    async fn process(
        &self,
        task: &BasicTask,
        ctx: &TaskContext,
    ) -> Result<String, IntentionalFailure> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(ms) = task.metadata().get("sleep_ms").and_then(Value::as_u64) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if let Some(ms) = task.metadata().get("block_ms").and_then(Value::as_u64) {
            std::thread::sleep(Duration::from_millis(ms));
        }
        let retries = task
            .metadata()
            .get("retries")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        for _ in 0..retries {
            ctx.record_retry();
        }

        self.processed
            .lock()
            .unwrap()
            .push(task.description().to_owned());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if task.description().starts_with("fail") {
            Err(IntentionalFailure(task.description().to_owned()))
        } else {
            Ok(format!("Processed: {}", task.description()))
        }
    }

    fn on_task_started(&self, _task: &BasicTask) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_task_completed(&self, _task: &BasicTask, _output: &String) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_task_failed(&self, _task: &BasicTask, _error: &IntentionalFailure) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_state_changed(&self, old: AgentState, new: AgentState) {
        self.transitions.lock().unwrap().push((old, new));
    }

    async fn on_starting(&self) -> Result<(), BoxError> {
        if self.fail_on_start.load(Ordering::SeqCst) {
            return Err("worker pool unavailable".into());
        }
        Ok(())
    }

    async fn on_pausing(&self) -> Result<(), BoxError> {
        if self.fail_on_pause.load(Ordering::SeqCst) {
            return Err("checkpoint refused".into());
        }
        Ok(())
    }

    async fn on_stopping(&self) -> Result<(), BoxError> {
        if self.fail_on_stop.load(Ordering::SeqCst) {
            return Err("flush failed".into());
        }
        Ok(())
    }

    async fn on_resetting(&self) -> Result<(), BoxError> {
        if self.fail_on_reset.load(Ordering::SeqCst) {
            return Err("state store locked".into());
        }
        Ok(())
    }

    fn memory_summary(&self, _memory: &ExecutionMemory) -> Option<String> {
        self.summary.clone()
    }
}

fn identity() -> AgentIdentity {
    AgentIdentity::builder("TestAgent")
        .version("1.0.0")
        .capabilities(["echo", "summarize"])
        .build()
        .unwrap()
}

fn agent_with(config: AgentConfig, handler: Scripted) -> AgentRuntime<Scripted> {
    AgentRuntime::new(identity(), config, handler)
}

fn agent() -> AgentRuntime<Scripted> {
    agent_with(AgentConfig::default(), Scripted::default())
}

fn sleepy(description: &str, ms: u64) -> BasicTask {
    BasicTask::new(description).with_metadata("sleep_ms", json!(ms))
}

#[tokio::test]
async fn submit_on_fresh_agent_is_not_running() {
    let agent = agent();

    let err = agent
        .submit(BasicTask::new("idle"))
        .await
        .expect_err("fresh agent must reject work");

    assert!(matches!(
        err,
        AgentError::NotRunning {
            state: AgentState::Created,
            ..
        }
    ));
    assert_eq!(err.agent_id(), agent.agent_id());
    assert_eq!(agent.handler().started.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn successful_task_is_recorded_everywhere() {
    let agent = agent();
    agent.start().await.unwrap();

    let task = BasicTask::new("summarize the report").with_priority(TaskPriority::High);
    let output = agent.submit(task).await.unwrap();
    assert_eq!(output, "Processed: summarize the report");

    let metrics = agent.metrics().snapshot();
    assert_eq!(metrics.processed(), 1);
    assert_eq!(metrics.succeeded(), 1);
    assert_eq!(metrics.failed(), 0);
    assert_eq!(metrics.high_priority, 1);
    assert_eq!(metrics.total_input_size, "summarize the report".len() as u64);
    assert_eq!(metrics.total_output_size, 1);

    let handler = agent.handler();
    assert_eq!(handler.started.load(Ordering::SeqCst), 1);
    assert_eq!(handler.completed.load(Ordering::SeqCst), 1);
    assert_eq!(handler.failed.load(Ordering::SeqCst), 0);

    let entries = agent.memory().entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_success());
    assert_eq!(entries[0].task(), "summarize the report");
    assert_eq!(entries[0].result(), Some("Processed: summarize the report"));
    assert!(entries[0].learning().is_none());
}

#[tokio::test]
async fn failing_task_records_learning_with_error_kind() {
    let agent = agent();
    agent.start().await.unwrap();

    let err = agent
        .submit(BasicTask::new("fail on purpose"))
        .await
        .expect_err("handler error must surface");

    assert!(matches!(err, AgentError::ProcessingFailed { .. }));
    let cause = err
        .handler_error::<IntentionalFailure>()
        .expect("original cause is retrievable");
    assert_eq!(cause.0, "fail on purpose");

    let metrics = agent.metrics().snapshot();
    assert_eq!(metrics.processed(), 1);
    assert_eq!(metrics.succeeded(), 0);
    assert_eq!(metrics.failed(), 1);
    assert_eq!(agent.handler().failed.load(Ordering::SeqCst), 1);

    let entry = agent.memory().entries().remove(0);
    assert!(!entry.is_success());
    assert!(entry.result().is_none());
    let learning = entry.learning().expect("failures carry a learning");
    assert!(learning.contains("IntentionalFailure"));
    assert!(learning.ends_with("intentional failure: fail on purpose"));
}

#[tokio::test]
async fn tasks_run_one_at_a_time_in_submission_order() {
    let agent = agent();
    agent.start().await.unwrap();

    let tasks: Vec<BasicTask> = (0..20_u64)
        .map(|i| sleepy(&format!("task-{i:02}"), (20 - i) % 3))
        .collect();
    let expected: Vec<String> = tasks.iter().map(|t| t.description().to_owned()).collect();

    let outcomes = agent.submit_all(tasks).await;
    assert!(outcomes.iter().all(Result::is_ok));

    assert_eq!(*agent.handler().processed.lock().unwrap(), expected);
    assert_eq!(agent.handler().max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn start_stop_reset_returns_to_a_clean_created_agent() {
    let agent = agent();
    agent.start().await.unwrap();
    agent.submit(BasicTask::new("one")).await.unwrap();
    agent.submit(BasicTask::new("fail two")).await.unwrap_err();

    agent.stop().await.unwrap();
    assert_eq!(agent.state(), AgentState::Stopped);
    agent.reset().await.unwrap();

    assert_eq!(agent.state(), AgentState::Created);
    let metrics = agent.metrics().snapshot();
    assert_eq!(metrics.processed() + metrics.succeeded() + metrics.failed(), 0);
    assert!(metrics.operations.last_finished_at.is_none());
    assert!(agent.memory().is_empty());
    assert!(agent.memory().summary().is_none());

    agent.start().await.unwrap();
    assert_eq!(agent.submit(BasicTask::new("again")).await.unwrap(), "Processed: again");
}

#[tokio::test]
async fn illegal_calls_report_current_and_attempted_state() {
    let agent = agent();

    let err = agent.stop().await.expect_err("stop from created is illegal");
    match err {
        AgentError::IllegalTransition {
            current, attempted, ..
        } => {
            assert_eq!(current, AgentState::Created);
            assert_eq!(attempted, AgentState::Stopping);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(agent.state(), AgentState::Created);

    agent.start().await.unwrap();
    let err = agent.reset().await.expect_err("reset while started is illegal");
    assert_eq!(err.state(), Some(AgentState::Started));
}

#[tokio::test]
async fn callers_never_observe_transitional_states() {
    let agent = agent();
    let steps: [(&str, bool); 10] = [
        ("start", true),
        ("pause", true),
        ("pause", false),
        ("start", true),
        ("stop", true),
        ("start", false),
        ("reset", true),
        ("reset", false),
        ("start", true),
        ("stop", true),
    ];

    for (step, legal) in steps {
        let outcome = match step {
            "start" => agent.start().await,
            "pause" => agent.pause().await,
            "stop" => agent.stop().await,
            _ => agent.reset().await,
        };
        assert_eq!(outcome.is_ok(), legal, "{step} from {}", agent.state());
        assert!(!agent.state().is_transitional());
    }

    let transitions = agent.handler().transitions.lock().unwrap();
    assert_eq!(transitions.len(), 14);
    assert!(transitions.iter().all(|(from, to)| from.can_transition(*to)));
}

#[tokio::test]
async fn pause_blocks_submissions_until_resumed() {
    let agent = agent();
    agent.start().await.unwrap();
    agent.pause().await.unwrap();

    let err = agent.submit(BasicTask::new("held")).await.unwrap_err();
    assert_eq!(err.state(), Some(AgentState::Paused));

    agent.start().await.unwrap();
    assert!(agent.is_running());
    agent.submit(BasicTask::new("released")).await.unwrap();
    assert_eq!(agent.metrics().snapshot().processed(), 1);
}

#[tokio::test]
async fn graceful_stop_drains_queued_tasks() {
    let agent = agent();
    agent.start().await.unwrap();

    let handles: Vec<_> = (0..5)
        .map(|i| agent.submit(sleepy(&format!("queued-{i}"), 5)))
        .collect();
    agent.stop().await.unwrap();

    for handle in handles {
        assert!(handle.await.is_ok());
    }
    assert_eq!(agent.metrics().snapshot().succeeded(), 5);
}

#[tokio::test]
async fn forced_stop_cancels_unfinished_tasks() {
    let config = AgentConfig::builder()
        .shutdown_timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    let agent = agent_with(config, Scripted::default());
    agent.start().await.unwrap();

    let slow = agent.submit(sleepy("slow", 10_000));
    let queued = agent.submit(BasicTask::new("never reached"));
    tokio::time::sleep(Duration::from_millis(20)).await;

    agent.stop().await.unwrap();
    assert_eq!(agent.state(), AgentState::Stopped);

    assert!(matches!(slow.await, Err(AgentError::Cancelled { .. })));
    assert!(matches!(queued.await, Err(AgentError::Cancelled { .. })));
    assert_eq!(agent.metrics().snapshot().processed(), 0);
}

#[tokio::test]
async fn hook_failure_forces_error_until_reset() {
    let agent = agent();
    agent.handler().fail_on_start.store(true, Ordering::SeqCst);

    let err = agent.start().await.expect_err("hook failure must surface");
    match &err {
        AgentError::LifecycleHook { state, source, .. } => {
            assert_eq!(*state, AgentState::Starting);
            assert_eq!(source.to_string(), "worker pool unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(agent.state(), AgentState::Error);
    assert!(!agent.status().is_healthy());

    let rejected = agent.submit(BasicTask::new("too early")).await.unwrap_err();
    assert_eq!(rejected.state(), Some(AgentState::Error));
    assert!(agent.start().await.is_err());

    agent.reset().await.unwrap();
    agent.handler().fail_on_start.store(false, Ordering::SeqCst);
    agent.start().await.unwrap();
    assert!(agent.submit(BasicTask::new("recovered")).await.is_ok());
}

fn assert_hook_failed(err: &AgentError, expected: AgentState, message: &str) {
    match err {
        AgentError::LifecycleHook { state, source, .. } => {
            assert_eq!(*state, expected);
            assert_eq!(source.to_string(), message);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn pausing_hook_failure_forces_error() {
    let agent = agent();
    agent.start().await.unwrap();
    agent.handler().fail_on_pause.store(true, Ordering::SeqCst);

    let err = agent.pause().await.expect_err("hook failure must surface");
    assert_hook_failed(&err, AgentState::Pausing, "checkpoint refused");
    assert_eq!(agent.state(), AgentState::Error);
    let rejected = agent.submit(BasicTask::new("after pause")).await.unwrap_err();
    assert_eq!(rejected.state(), Some(AgentState::Error));

    agent.reset().await.unwrap();
    assert_eq!(agent.state(), AgentState::Created);
}

#[tokio::test]
async fn stopping_hook_failure_forces_error() {
    let agent = agent();
    agent.start().await.unwrap();
    agent.handler().fail_on_stop.store(true, Ordering::SeqCst);

    let err = agent.stop().await.expect_err("hook failure must surface");
    assert_hook_failed(&err, AgentState::Stopping, "flush failed");
    assert_eq!(agent.state(), AgentState::Error);
    assert!(agent.stop().await.is_err());

    agent.handler().fail_on_stop.store(false, Ordering::SeqCst);
    agent.reset().await.unwrap();
    agent.start().await.unwrap();
    assert!(agent.submit(BasicTask::new("restarted")).await.is_ok());
}

#[tokio::test]
async fn resetting_hook_failure_forces_error() {
    let agent = agent();
    agent.start().await.unwrap();
    agent.submit(BasicTask::new("before reset")).await.unwrap();
    agent.stop().await.unwrap();
    agent.handler().fail_on_reset.store(true, Ordering::SeqCst);

    let err = agent.reset().await.expect_err("hook failure must surface");
    assert_hook_failed(&err, AgentState::Resetting, "state store locked");
    assert_eq!(agent.state(), AgentState::Error);

    agent.handler().fail_on_reset.store(false, Ordering::SeqCst);
    agent.reset().await.unwrap();
    assert_eq!(agent.state(), AgentState::Created);
    assert!(agent.memory().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn task_outliving_forced_stop_leaves_reset_agent_clean() {
    let config = AgentConfig::builder()
        .shutdown_timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    let agent = agent_with(config, Scripted::default());
    agent.start().await.unwrap();

    let blocking = agent.submit(BasicTask::new("blocking").with_metadata("block_ms", json!(300)));
    tokio::time::sleep(Duration::from_millis(20)).await;

    agent.stop().await.unwrap();
    agent.reset().await.unwrap();
    assert_eq!(agent.state(), AgentState::Created);

    assert!(matches!(blocking.await, Err(AgentError::Cancelled { .. })));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(agent.metrics().snapshot().processed(), 0);
    assert!(agent.memory().is_empty());
    assert_eq!(agent.handler().completed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_lifecycle_calls_serialize() {
    let agent = agent();

    let (first, second) = tokio::join!(agent.start(), agent.start());
    assert!(first.is_ok() ^ second.is_ok());
    let err = first.err().or(second.err()).unwrap();
    assert_eq!(err.state(), Some(AgentState::Started));
}

#[tokio::test]
async fn state_subscribers_see_lifecycle_changes() {
    let agent = agent();
    let mut states = agent.subscribe_state();

    agent.start().await.unwrap();
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), AgentState::Started);

    agent.pause().await.unwrap();
    states.changed().await.unwrap();
    assert_eq!(*states.borrow(), AgentState::Paused);
}

#[tokio::test]
async fn memory_is_compacted_as_tasks_complete() {
    let config = AgentConfig::builder().memory_capacity(10).build().unwrap();
    let agent = agent_with(config, Scripted::default());
    agent.start().await.unwrap();

    let tasks = (1..=15).map(|i| BasicTask::new(format!("entry-{i}")));
    agent.submit_all(tasks).await;

    let ids: Vec<u64> = agent.memory().entries().iter().map(|e| e.id()).collect();
    assert_eq!(ids, (9..=15).collect::<Vec<_>>());
    assert_eq!(agent.metrics().snapshot().processed(), 15);
}

#[test]
fn compact_memory_summarizes_long_histories() {
    let agent = agent();
    assert!(agent.compact_memory().is_none());

    for i in 0..12 {
        let task = BasicTask::new(format!("task-{i}"));
        agent.record_learning(&task, None, format!("learning {i}"));
    }
    assert!(agent.memory().summary().is_none());

    let summary = agent.compact_memory().expect("more than ten entries");
    assert!(summary.contains("Agent Memory Summary"));
    assert!(summary.contains("TestAgent"));
    assert!(summary.contains("learning 11"));
    assert_eq!(agent.memory().summary().as_deref(), Some(summary.as_str()));
}

#[test]
fn handler_can_supply_its_own_summary() {
    let handler = Scripted {
        summary: Some("custom digest".to_owned()),
        ..Scripted::default()
    };
    let agent = agent_with(AgentConfig::default(), handler);
    for i in 0..11 {
        agent.record_learning(&BasicTask::new(format!("t{i}")), None, "noted");
    }

    assert_eq!(agent.compact_memory().as_deref(), Some("custom digest"));
    assert_eq!(agent.memory().summary().as_deref(), Some("custom digest"));
}

#[test]
fn blank_custom_summary_is_not_stored() {
    let handler = Scripted {
        summary: Some("  \n".to_owned()),
        ..Scripted::default()
    };
    let agent = agent_with(AgentConfig::default(), handler);
    for i in 0..11 {
        agent.record_learning(&BasicTask::new(format!("t{i}")), None, "noted");
    }

    assert!(agent.compact_memory().is_none());
    assert!(agent.memory().summary().is_none());
}

#[tokio::test]
async fn handler_retries_are_counted() {
    let agent = agent();
    agent.start().await.unwrap();

    let task = BasicTask::new("flaky").with_metadata("retries", json!(2));
    agent.submit(task).await.unwrap();
    agent.submit(BasicTask::new("steady")).await.unwrap();

    let metrics = agent.metrics().snapshot();
    assert_eq!(metrics.retried, 2);
    assert!((metrics.retry_rate() - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn disabled_metrics_still_record_memory() {
    let config = AgentConfig::builder().metrics_enabled(false).build().unwrap();
    let agent = agent_with(config, Scripted::default());
    agent.start().await.unwrap();

    agent.submit(BasicTask::new("quiet")).await.unwrap();

    assert_eq!(agent.metrics().snapshot().processed(), 0);
    assert_eq!(agent.memory().len(), 1);
    assert!(!agent.status().metrics_enabled);
}

#[tokio::test]
async fn chat_runtime_counts_conversations() {
    let agent: ChatRuntime<Scripted> = AgentRuntime::builder(identity(), Scripted::default())
        .metrics(ConversationMetrics::new())
        .build();
    agent.start().await.unwrap();

    agent.submit(BasicTask::new("hello")).await.unwrap();
    agent.submit(BasicTask::new("how are you")).await.unwrap();
    agent.submit(BasicTask::new("fail please")).await.unwrap_err();

    let snap = agent.metrics().snapshot();
    assert_eq!(snap.started, 3);
    assert_eq!(snap.completed, 2);
    assert_eq!(snap.abandoned, 1);
    assert_eq!(snap.active, 0);
    assert_eq!(snap.messages, 4);
    assert_eq!(snap.operations.processed, 3);
}

#[tokio::test]
async fn status_serializes_for_reporting() {
    let agent = agent();
    agent.start().await.unwrap();
    agent.submit(BasicTask::new("report")).await.unwrap();

    let status = agent.status();
    assert!(status.to_string().starts_with("TestAgent v1.0.0 ["));

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["state"], "STARTED");
    assert_eq!(json["identity"]["name"], "TestAgent");
    assert_eq!(json["metrics"]["operations"]["processed"], 1);
    assert_eq!(json["memory"]["total"], 1);
    assert_eq!(agent.metrics().operations().succeeded, 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn metrics_follow_submitted_outcomes(successes in 0usize..12, failures in 0usize..12) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let snapshot = runtime.block_on(async {
            let agent = agent();
            agent.start().await.unwrap();
            let tasks = (0..successes)
                .map(|i| BasicTask::new(format!("ok-{i}")))
                .chain((0..failures).map(|i| BasicTask::new(format!("fail-{i}"))));
            agent.submit_all(tasks).await;
            agent.stop().await.unwrap();
            agent.metrics().snapshot()
        });

        let total = (successes + failures) as u64;
        prop_assert_eq!(snapshot.processed(), total);
        prop_assert_eq!(snapshot.succeeded(), successes as u64);
        prop_assert_eq!(snapshot.failed(), failures as u64);
        let expected = if total == 0 { 0.0 } else { successes as f64 / total as f64 };
        prop_assert!((snapshot.success_rate() - expected).abs() < 1e-9);
    }
}
