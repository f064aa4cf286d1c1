//! Task-oriented metrics: retries, payload sizes, and priority buckets.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use agent_primitives::TaskPriority;
use serde::Serialize;
use tracing::debug;

use super::operation::Operations;
use super::{ratio, Gate, OperationSnapshot, OutcomeMetrics, OutcomeSample};

/// Metrics for agents that process discrete tasks.
#[derive(Debug, Default)]
pub struct TaskMetrics {
    gate: Gate,
    operations: Operations,
    retried: AtomicU64,
    input_total: AtomicU64,
    output_total: AtomicU64,
    high: AtomicU64,
    medium: AtomicU64,
    low: AtomicU64,
}

impl TaskMetrics {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the start of a task.
    pub fn record_operation_started(&self) {
        let _gate = self.gate.shared();
        self.operations.started();
    }

    /// Records a successful task.
    pub fn record_task_succeeded(
        &self,
        elapsed: Duration,
        input_size: u64,
        output_size: u64,
        priority: TaskPriority,
    ) {
        let _gate = self.gate.shared();
        self.operations.succeeded(elapsed);
        self.input_total.fetch_add(input_size, Ordering::Relaxed);
        self.output_total.fetch_add(output_size, Ordering::Relaxed);
        self.bucket(priority).fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed task.
    pub fn record_task_failed(&self, elapsed: Duration, input_size: u64, priority: TaskPriority) {
        let _gate = self.gate.shared();
        self.operations.failed(elapsed);
        self.input_total.fetch_add(input_size, Ordering::Relaxed);
        self.bucket(priority).fetch_add(1, Ordering::Relaxed);
    }

    /// Records a single retry.
    pub fn record_task_retry(&self) {
        self.record_retries(1);
    }

    fn bucket(&self, priority: TaskPriority) -> &AtomicU64 {
        match priority {
            TaskPriority::Critical | TaskPriority::High => &self.high,
            TaskPriority::Normal => &self.medium,
            TaskPriority::Low => &self.low,
        }
    }
}

impl OutcomeMetrics for TaskMetrics {
    type Snapshot = TaskMetricsSnapshot;

    fn record_started(&self) {
        self.record_operation_started();
    }

    fn record_succeeded(&self, sample: &OutcomeSample) {
        self.record_task_succeeded(
            sample.elapsed,
            sample.input_size,
            sample.output_size,
            sample.priority,
        );
    }

    fn record_failed(&self, sample: &OutcomeSample) {
        self.record_task_failed(sample.elapsed, sample.input_size, sample.priority);
    }

    fn record_retries(&self, count: u64) {
        let _gate = self.gate.shared();
        self.retried.fetch_add(count, Ordering::Relaxed);
    }

    fn reset(&self) {
        let _gate = self.gate.exclusive();
        self.operations.reset();
        for counter in [
            &self.retried,
            &self.input_total,
            &self.output_total,
            &self.high,
            &self.medium,
            &self.low,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        debug!("task metrics reset");
    }

    fn snapshot(&self) -> TaskMetricsSnapshot {
        let _gate = self.gate.exclusive();
        TaskMetricsSnapshot {
            operations: self.operations.snapshot(),
            retried: self.retried.load(Ordering::Relaxed),
            total_input_size: self.input_total.load(Ordering::Relaxed),
            total_output_size: self.output_total.load(Ordering::Relaxed),
            high_priority: self.high.load(Ordering::Relaxed),
            medium_priority: self.medium.load(Ordering::Relaxed),
            low_priority: self.low.load(Ordering::Relaxed),
        }
    }

    fn operations(&self) -> OperationSnapshot {
        let _gate = self.gate.exclusive();
        self.operations.snapshot()
    }
}

/// Point-in-time view of [`TaskMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskMetricsSnapshot {
    /// Shared operation counters.
    pub operations: OperationSnapshot,
    /// Retries reported by handlers.
    pub retried: u64,
    /// Sum of input sizes over all tasks.
    pub total_input_size: u64,
    /// Sum of output sizes over successful tasks.
    pub total_output_size: u64,
    /// Tasks with `High` or `Critical` priority.
    pub high_priority: u64,
    /// Tasks with `Normal` priority.
    pub medium_priority: u64,
    /// Tasks with `Low` priority.
    pub low_priority: u64,
}

impl TaskMetricsSnapshot {
    /// Tasks processed.
    #[must_use]
    pub const fn processed(&self) -> u64 {
        self.operations.processed
    }

    /// Tasks that succeeded.
    #[must_use]
    pub const fn succeeded(&self) -> u64 {
        self.operations.succeeded
    }

    /// Tasks that failed.
    #[must_use]
    pub const fn failed(&self) -> u64 {
        self.operations.failed
    }

    /// `succeeded / processed`.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        self.operations.success_rate()
    }

    /// `retried / processed`.
    #[must_use]
    pub fn retry_rate(&self) -> f64 {
        ratio(self.retried, self.operations.processed)
    }

    /// Mean input size over all tasks.
    #[must_use]
    pub fn average_input_size(&self) -> f64 {
        ratio(self.total_input_size, self.operations.processed)
    }

    /// Mean output size over successful tasks.
    #[must_use]
    pub fn average_output_size(&self) -> f64 {
        ratio(self.total_output_size, self.operations.succeeded)
    }
}

impl fmt::Display for TaskMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ops = &self.operations;
        write!(
            f,
            "tasks={}, succeeded={}, failed={}, retries={}, successRate={:.2}%, \
             avgInputSize={:.1}, avgOutputSize={:.1}, priorityDist[H:{},M:{},L:{}], \
             avgTime={:?}, minTime={:?}, maxTime={:?}, throughput={:.2} ops/sec, uptime={:?}",
            ops.processed,
            ops.succeeded,
            ops.failed,
            self.retried,
            self.success_rate() * 100.0,
            self.average_input_size(),
            self.average_output_size(),
            self.high_priority,
            self.medium_priority,
            self.low_priority,
            ops.average_duration(),
            ops.min_duration,
            ops.max_duration,
            ops.throughput(),
            ops.uptime,
        )
    }
}
