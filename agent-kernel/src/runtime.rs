//! Agent runtime: lifecycle operations, task submission, and bookkeeping.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use agent_config::AgentConfig;
use agent_memory::{ExecutionMemory, DEFAULT_SUMMARY_ENTRIES};
use agent_primitives::{AgentId, AgentIdentity, WorkItem};
use agent_telemetry::{ConversationMetrics, OutcomeMetrics, TaskMetrics};
use futures::future::{join_all, JoinAll};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{AgentError, AgentResult, BoxError};
use crate::handler::TaskHandler;
use crate::lifecycle::{AgentState, Lifecycle};
use crate::status::AgentStatus;
use crate::worker::{TaskHandle, Worker};

/// Entry count above which [`AgentRuntime::compact_memory`] writes a summary.
pub const SUMMARY_THRESHOLD: usize = 10;

/// State shared between the runtime and its worker.
pub(crate) struct Shared<H, M> {
    pub(crate) identity: AgentIdentity,
    pub(crate) config: Arc<AgentConfig>,
    pub(crate) handler: H,
    pub(crate) metrics: M,
    pub(crate) memory: ExecutionMemory,
}

/// Long-lived agent that processes tasks on a single dedicated worker.
///
/// Lifecycle calls are serialized per agent and validated against
/// [`AgentState::can_transition`]. Tasks are accepted only while
/// [`AgentState::Started`] and run one at a time in submission order.
pub struct AgentRuntime<H, M = TaskMetrics>
where
    H: TaskHandler,
    M: OutcomeMetrics,
{
    shared: Arc<Shared<H, M>>,
    lifecycle: Lifecycle,
    transitions: tokio::sync::Mutex<()>,
    worker: Mutex<Option<Worker<H>>>,
}

/// Runtime for conversational agents, aggregating [`ConversationMetrics`].
pub type ChatRuntime<H> = AgentRuntime<H, ConversationMetrics>;

impl<H> AgentRuntime<H, TaskMetrics>
where
    H: TaskHandler,
{
    /// Starts building a runtime for `identity` driven by `handler`.
    #[must_use]
    pub fn builder(identity: AgentIdentity, handler: H) -> AgentRuntimeBuilder<H, TaskMetrics> {
        AgentRuntimeBuilder {
            identity,
            handler,
            config: AgentConfig::default(),
            metrics: TaskMetrics::default(),
        }
    }

    /// Creates a runtime with task metrics.
    #[must_use]
    pub fn new(identity: AgentIdentity, config: AgentConfig, handler: H) -> Self {
        Self::builder(identity, handler).config(config).build()
    }
}

impl<H, M> AgentRuntime<H, M>
where
    H: TaskHandler,
    M: OutcomeMetrics,
{
    /// Returns the identifier of this agent.
    #[must_use]
    pub fn agent_id(&self) -> AgentId {
        self.shared.identity.id()
    }

    /// Returns the agent identity.
    #[must_use]
    pub fn identity(&self) -> &AgentIdentity {
        &self.shared.identity
    }

    /// Returns the immutable configuration.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.shared.config
    }

    /// Returns the task handler.
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.shared.handler
    }

    /// Returns the metrics aggregator.
    #[must_use]
    pub fn metrics(&self) -> &M {
        &self.shared.metrics
    }

    /// Returns the execution history.
    #[must_use]
    pub fn memory(&self) -> &ExecutionMemory {
        &self.shared.memory
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AgentState {
        self.lifecycle.state()
    }

    /// Returns a receiver notified on every state change.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<AgentState> {
        self.lifecycle.subscribe()
    }

    /// Returns `true` while tasks are accepted.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state().can_process_tasks()
    }

    /// Returns `true` while paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state() == AgentState::Paused
    }

    /// Submits a task without blocking.
    ///
    /// The returned handle resolves with [`AgentError::NotRunning`] right away
    /// unless the agent is [`AgentState::Started`].
    pub fn submit(&self, task: H::Task) -> TaskHandle<H::Output> {
        let agent_id = self.agent_id();
        let state = self.state();
        if !state.can_process_tasks() {
            debug!(%agent_id, ?state, "task rejected");
            return TaskHandle::resolved(agent_id, Err(AgentError::NotRunning { agent_id, state }));
        }

        let slot = self.worker_slot();
        let Some(worker) = slot.as_ref() else {
            let state = self.state();
            return TaskHandle::resolved(agent_id, Err(AgentError::NotRunning { agent_id, state }));
        };
        let (reply, handle) = TaskHandle::channel(agent_id);
        worker.enqueue(task, reply);
        handle
    }

    /// Submits every task in order and waits for all outcomes.
    pub fn submit_all<I>(&self, tasks: I) -> JoinAll<TaskHandle<H::Output>>
    where
        I: IntoIterator<Item = H::Task>,
    {
        join_all(tasks.into_iter().map(|task| self.submit(task)))
    }

    /// Moves `Created` or `Paused` to `Started`, provisioning the worker if needed.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::IllegalTransition`] from any other state, and
    /// [`AgentError::LifecycleHook`] when [`TaskHandler::on_starting`] fails or
    /// no tokio runtime is available to host the worker.
    pub async fn start(&self) -> AgentResult<()> {
        self.drive(AgentState::Starting, AgentState::Started, self.do_start())
            .await
    }

    /// Moves `Started` to `Paused`. The worker stays provisioned.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::IllegalTransition`] from any other state, and
    /// [`AgentError::LifecycleHook`] when [`TaskHandler::on_pausing`] fails.
    pub async fn pause(&self) -> AgentResult<()> {
        self.drive(AgentState::Pausing, AgentState::Paused, self.do_pause())
            .await
    }

    /// Moves `Started` or `Paused` to `Stopped`.
    ///
    /// Queued tasks are drained for up to the configured shutdown timeout;
    /// past it the worker is aborted and unfinished tasks resolve with
    /// [`AgentError::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::IllegalTransition`] from any other state, and
    /// [`AgentError::LifecycleHook`] when [`TaskHandler::on_stopping`] fails.
    pub async fn stop(&self) -> AgentResult<()> {
        self.drive(AgentState::Stopping, AgentState::Stopped, self.do_stop())
            .await
    }

    /// Moves `Stopped` or `Error` back to `Created`, clearing metrics and memory.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::IllegalTransition`] from any other state, and
    /// [`AgentError::LifecycleHook`] when [`TaskHandler::on_resetting`] fails.
    pub async fn reset(&self) -> AgentResult<()> {
        self.drive(AgentState::Resetting, AgentState::Created, self.do_reset())
            .await
    }

    /// Compacts the history and, when more than [`SUMMARY_THRESHOLD`] entries
    /// remain, stores a fresh summary.
    ///
    /// The summary comes from [`TaskHandler::memory_summary`] when it returns
    /// text, otherwise from the built-in digest. A blank custom summary is
    /// not stored. Returns the stored summary.
    pub fn compact_memory(&self) -> Option<String> {
        let memory = &self.shared.memory;
        let evicted = memory.compact();
        if memory.len() <= SUMMARY_THRESHOLD {
            debug!(agent_id = %self.agent_id(), evicted, "memory compacted");
            return None;
        }

        let summary = match self.shared.handler.memory_summary(memory) {
            Some(custom) if custom.trim().is_empty() => {
                debug!(
                    agent_id = %self.agent_id(),
                    evicted,
                    "memory compacted; blank summary skipped"
                );
                return None;
            }
            Some(custom) => {
                memory.set_summary(custom.clone());
                custom
            }
            None => memory.summarize(self.shared.identity.name(), DEFAULT_SUMMARY_ENTRIES),
        };
        debug!(agent_id = %self.agent_id(), evicted, "memory compacted and summarized");
        Some(summary)
    }

    /// Drops every history entry and the summary.
    pub fn clear_memory(&self) {
        self.shared.memory.clear();
    }

    /// Stores a successful, zero-duration entry carrying `learning`.
    pub fn record_learning(
        &self,
        task: &H::Task,
        result: Option<&H::Output>,
        learning: impl Into<String>,
    ) -> u64 {
        self.shared.memory.record(
            task.describe(),
            result.map(ToString::to_string),
            true,
            std::time::Duration::ZERO,
            Some(learning.into()),
        )
    }

    /// Point-in-time status for health and status reporting.
    #[must_use]
    pub fn status(&self) -> AgentStatus<M::Snapshot> {
        AgentStatus::new(
            self.shared.identity.clone(),
            self.state(),
            self.shared.config.metrics_enabled(),
            self.shared.metrics.snapshot(),
            self.shared.memory.stats(),
        )
    }

    async fn drive<F>(&self, intermediate: AgentState, target: AgentState, step: F) -> AgentResult<()>
    where
        F: Future<Output = Result<(), BoxError>>,
    {
        let _guard = self.transitions.lock().await;
        self.enter(intermediate)?;

        match step.await {
            Ok(()) => {
                self.enter(target)?;
                info!(agent_id = %self.agent_id(), state = ?target, "agent lifecycle step complete");
                Ok(())
            }
            Err(source) => {
                let previous = self.lifecycle.force(AgentState::Error);
                self.shared
                    .handler
                    .on_state_changed(previous, AgentState::Error);
                warn!(agent_id = %self.agent_id(), state = ?intermediate, error = %source, "lifecycle hook failed");
                Err(AgentError::LifecycleHook {
                    agent_id: self.agent_id(),
                    state: intermediate,
                    source,
                })
            }
        }
    }

    fn enter(&self, next: AgentState) -> AgentResult<()> {
        let previous = self.lifecycle.transition(next)?;
        self.shared.handler.on_state_changed(previous, next);
        Ok(())
    }

    async fn do_start(&self) -> Result<(), BoxError> {
        self.shared.handler.on_starting().await?;

        let mut slot = self.worker_slot();
        if !slot.as_ref().is_some_and(Worker::is_alive) {
            *slot = Some(Worker::spawn(Arc::clone(&self.shared))?);
            debug!(agent_id = %self.agent_id(), "worker provisioned");
        }
        Ok(())
    }

    async fn do_pause(&self) -> Result<(), BoxError> {
        self.shared.handler.on_pausing().await
    }

    async fn do_stop(&self) -> Result<(), BoxError> {
        let worker = self.worker_slot().take();
        if let Some(worker) = worker {
            let drained = worker.shutdown(self.shared.config.shutdown_timeout()).await;
            debug!(agent_id = %self.agent_id(), drained, "worker released");
        }
        self.shared.handler.on_stopping().await
    }

    async fn do_reset(&self) -> Result<(), BoxError> {
        self.shared.metrics.reset();
        self.shared.memory.clear();
        self.shared.handler.on_resetting().await
    }

    fn worker_slot(&self) -> MutexGuard<'_, Option<Worker<H>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H, M> fmt::Debug for AgentRuntime<H, M>
where
    H: TaskHandler,
    M: OutcomeMetrics,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("agent_id", &self.agent_id())
            .field("name", &self.shared.identity.name())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<H, M> fmt::Display for AgentRuntime<H, M>
where
    H: TaskHandler,
    M: OutcomeMetrics,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let identity = &self.shared.identity;
        write!(
            f,
            "{}{{id={}, version={}, state={}}}",
            identity.name(),
            identity.id(),
            identity.version(),
            self.state()
        )
    }
}

/// Builder for [`AgentRuntime`].
#[derive(Debug)]
pub struct AgentRuntimeBuilder<H, M> {
    identity: AgentIdentity,
    handler: H,
    config: AgentConfig,
    metrics: M,
}

impl<H, M> AgentRuntimeBuilder<H, M>
where
    H: TaskHandler,
    M: OutcomeMetrics,
{
    /// Overrides the default configuration.
    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Swaps the metrics aggregator, e.g. for [`ConversationMetrics`].
    #[must_use]
    pub fn metrics<N: OutcomeMetrics>(self, metrics: N) -> AgentRuntimeBuilder<H, N> {
        AgentRuntimeBuilder {
            identity: self.identity,
            handler: self.handler,
            config: self.config,
            metrics,
        }
    }

    /// Finishes the runtime in [`AgentState::Created`].
    #[must_use]
    pub fn build(self) -> AgentRuntime<H, M> {
        let lifecycle = Lifecycle::new(self.identity.id());
        let memory = ExecutionMemory::new(self.config.memory_capacity());
        debug!(agent_id = %self.identity.id(), name = self.identity.name(), "agent runtime created");

        AgentRuntime {
            shared: Arc::new(Shared {
                identity: self.identity,
                config: Arc::new(self.config),
                handler: self.handler,
                metrics: self.metrics,
                memory,
            }),
            lifecycle,
            transitions: tokio::sync::Mutex::new(()),
            worker: Mutex::new(None),
        }
    }
}
