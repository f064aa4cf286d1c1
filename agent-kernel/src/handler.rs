//! Extension points implemented by concrete agents.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use agent_config::AgentConfig;
use agent_memory::ExecutionMemory;
use agent_primitives::{AgentId, WorkItem};
use async_trait::async_trait;

use crate::error::BoxError;
use crate::lifecycle::AgentState;

/// Context handed to [`TaskHandler::process`] for a single task.
#[derive(Debug)]
pub struct TaskContext {
    agent_id: AgentId,
    started_at: Instant,
    config: Arc<AgentConfig>,
    retries: AtomicU64,
}

impl TaskContext {
    pub(crate) fn new(agent_id: AgentId, config: Arc<AgentConfig>) -> Self {
        Self {
            agent_id,
            started_at: Instant::now(),
            config,
            retries: AtomicU64::new(0),
        }
    }

    /// Returns the agent identifier.
    #[must_use]
    pub const fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    /// Returns the time the worker picked the task up.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Time spent on the task so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Configured task timeout. Advisory: the runtime does not enforce it.
    #[must_use]
    pub fn task_timeout(&self) -> Duration {
        self.config.task_timeout()
    }

    /// Agent instructions, if configured.
    #[must_use]
    pub fn instructions(&self) -> Option<&str> {
        self.config.instructions()
    }

    /// Returns the agent configuration.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Reports one internal retry; flushed into the metrics once the task ends.
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Retries reported so far.
    #[must_use]
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }
}

/// Domain logic plugged into an [`AgentRuntime`](crate::AgentRuntime).
///
/// Only [`process`](TaskHandler::process) is required. Every hook defaults to
/// a no-op. Task hooks run on the worker; lifecycle hooks run inside the
/// corresponding lifecycle call, and an error from one of them moves the
/// agent to [`AgentState::Error`].
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    /// Unit of work accepted by the agent.
    type Task: WorkItem;
    /// Value produced for a successful task.
    type Output: fmt::Display + Send + 'static;
    /// Error produced for a failed task.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Processes one task. Called exactly once per submitted task, on the worker.
    async fn process(
        &self,
        task: &Self::Task,
        ctx: &TaskContext,
    ) -> Result<Self::Output, Self::Error>;

    /// Called before [`process`](TaskHandler::process).
    fn on_task_started(&self, task: &Self::Task) {
        let _ = task;
    }

    /// Called after a successful task has been recorded.
    fn on_task_completed(&self, task: &Self::Task, output: &Self::Output) {
        let _ = (task, output);
    }

    /// Called after a failed task has been recorded.
    fn on_task_failed(&self, task: &Self::Task, error: &Self::Error) {
        let _ = (task, error);
    }

    /// Called on every state change, including forced moves to `Error`.
    fn on_state_changed(&self, old: AgentState, new: AgentState) {
        let _ = (old, new);
    }

    /// Runs while the agent is `Starting`.
    async fn on_starting(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs while the agent is `Pausing`.
    async fn on_pausing(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs while the agent is `Stopping`, after the worker has been torn down.
    async fn on_stopping(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs while the agent is `Resetting`, after metrics and memory are cleared.
    async fn on_resetting(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Approximate size of an output, fed into the metrics.
    fn estimate_output_size(&self, output: &Self::Output) -> u64 {
        let _ = output;
        1
    }

    /// Custom memory summary; `None` falls back to the built-in digest and
    /// blank text stores nothing.
    fn memory_summary(&self, memory: &ExecutionMemory) -> Option<String> {
        let _ = memory;
        None
    }
}

/// Short name of an error type, without its module path or generics.
pub(crate) fn error_kind<E: ?Sized>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
