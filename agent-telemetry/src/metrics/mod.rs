//! Thread-safe metrics aggregators.
//!
//! Counters are plain atomics so concurrent writers never block each other.
//! Each aggregator additionally owns a gate: writers enter it shared, while
//! [`reset`](OutcomeMetrics::reset) and [`snapshot`](OutcomeMetrics::snapshot)
//! enter it exclusively. A snapshot therefore never observes a half-applied
//! outcome or a half-finished reset.

mod conversation;
mod operation;
mod task;

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use agent_primitives::TaskPriority;
use serde::Serialize;

pub use conversation::{ConversationMetrics, ConversationSnapshot, MessageCounts};
pub use operation::OperationSnapshot;
pub use task::{TaskMetrics, TaskMetricsSnapshot};

/// Measurements taken for one finished task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeSample {
    /// Wall-clock processing time.
    pub elapsed: Duration,
    /// Approximate input size reported by the work item.
    pub input_size: u64,
    /// Approximate output size; zero for failures.
    pub output_size: u64,
    /// Priority of the work item.
    pub priority: TaskPriority,
}

/// Aggregator the runtime feeds with task outcomes.
///
/// Implementations must tolerate concurrent calls from any thread.
pub trait OutcomeMetrics: Default + Send + Sync + 'static {
    /// Consistent point-in-time view of the aggregator.
    type Snapshot: Clone + fmt::Debug + Serialize + Send + Sync + 'static;

    /// A task has been picked up by the worker.
    fn record_started(&self);

    /// A task finished successfully.
    fn record_succeeded(&self, sample: &OutcomeSample);

    /// A task failed.
    fn record_failed(&self, sample: &OutcomeSample);

    /// The handler retried internally `count` times while processing a task.
    fn record_retries(&self, count: u64) {
        let _ = count;
    }

    /// Zeroes every counter and clears every timestamp in one step.
    fn reset(&self);

    /// Takes a consistent snapshot.
    fn snapshot(&self) -> Self::Snapshot;

    /// Takes a consistent snapshot of the shared operation counters only.
    fn operations(&self) -> OperationSnapshot;
}

#[derive(Debug, Default)]
pub(crate) struct Gate(RwLock<()>);

impl Gate {
    pub(crate) fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
