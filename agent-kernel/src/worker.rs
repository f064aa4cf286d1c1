//! Single background worker that processes an agent's tasks in submission order.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use agent_primitives::{AgentId, WorkItem};
use agent_telemetry::{OutcomeMetrics, OutcomeSample};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{AgentError, AgentResult, BoxError};
use crate::handler::{error_kind, TaskContext, TaskHandler};
use crate::runtime::Shared;

type Reply<O> = oneshot::Sender<AgentResult<O>>;

struct Job<T, O> {
    task: T,
    reply: Reply<O>,
}

/// Raised when a forced stop gives up on the worker.
///
/// Task bookkeeping runs under the same lock, so once [`Worker::shutdown`]
/// returns no outcome reaches the metrics, the memory or the handler hooks.
#[derive(Debug, Default)]
struct Abandoned(Mutex<bool>);

impl Abandoned {
    fn raise(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }

    /// Runs `f` unless the worker has been abandoned.
    fn unless_raised<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let raised = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if *raised { None } else { Some(f()) }
    }
}

/// Owner side of a running worker task.
pub(crate) struct Worker<H: TaskHandler> {
    agent_id: AgentId,
    queue: mpsc::UnboundedSender<Job<H::Task, H::Output>>,
    handle: JoinHandle<()>,
    abandoned: Arc<Abandoned>,
}

impl<H: TaskHandler> Worker<H> {
    /// Spawns the worker on the ambient tokio runtime.
    pub(crate) fn spawn<M: OutcomeMetrics>(shared: Arc<Shared<H, M>>) -> Result<Self, BoxError> {
        let runtime = Handle::try_current()?;
        let agent_id = shared.identity.id();
        let (queue, mut jobs) = mpsc::unbounded_channel::<Job<H::Task, H::Output>>();
        let abandoned = Arc::new(Abandoned::default());
        let flag = Arc::clone(&abandoned);

        let handle = runtime.spawn(async move {
            debug!(%agent_id, "worker started");
            while let Some(Job { task, reply }) = jobs.recv().await {
                let outcome = execute(&shared, &flag, &task).await;
                // The caller may have dropped its handle; the outcome is already recorded.
                let _ = reply.send(outcome);
            }
            debug!(%agent_id, "worker drained");
        });

        Ok(Self {
            agent_id,
            queue,
            handle,
            abandoned,
        })
    }

    pub(crate) fn is_alive(&self) -> bool {
        !self.handle.is_finished() && !self.queue.is_closed()
    }

    pub(crate) fn enqueue(&self, task: H::Task, reply: Reply<H::Output>) {
        if let Err(mpsc::error::SendError(job)) = self.queue.send(Job { task, reply }) {
            warn!(agent_id = %self.agent_id, "worker gone; task cancelled");
            let _ = job.reply.send(Err(AgentError::Cancelled {
                agent_id: self.agent_id,
            }));
        }
    }

    /// Closes the queue and waits for the backlog to drain.
    ///
    /// Returns `false` when `timeout` elapsed and the worker had to be aborted.
    /// Aborting resolves every outstanding handle with
    /// [`AgentError::Cancelled`], including a task whose handler ignores the
    /// abort and runs to completion; its outcome is discarded.
    pub(crate) async fn shutdown(self, timeout: Duration) -> bool {
        let Self {
            agent_id,
            queue,
            mut handle,
            abandoned,
        } = self;
        drop(queue);

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => true,
            Ok(Err(error)) => {
                warn!(%agent_id, %error, "worker terminated abnormally");
                true
            }
            Err(_) => {
                abandoned.raise();
                handle.abort();
                warn!(%agent_id, ?timeout, "worker did not drain in time; aborted");
                false
            }
        }
    }
}

async fn execute<H, M>(
    shared: &Shared<H, M>,
    abandoned: &Abandoned,
    task: &H::Task,
) -> AgentResult<H::Output>
where
    H: TaskHandler,
    M: OutcomeMetrics,
{
    let agent_id = shared.identity.id();
    let metrics = shared.config.metrics_enabled().then_some(&shared.metrics);
    let handler = &shared.handler;

    let picked_up = abandoned.unless_raised(|| {
        if let Some(metrics) = metrics {
            metrics.record_started();
        }
        handler.on_task_started(task);
    });
    if picked_up.is_none() {
        return Err(AgentError::Cancelled { agent_id });
    }
    debug!(agent = %agent_id.short(), priority = ?task.priority(), "task started");

    let ctx = TaskContext::new(agent_id, Arc::clone(&shared.config));
    let outcome = handler.process(task, &ctx).await;
    let elapsed = ctx.elapsed();

    let settled = abandoned.unless_raised(|| {
        let result = settle(shared, task, outcome, elapsed);
        let retries = ctx.retries();
        if retries > 0 {
            if let Some(metrics) = metrics {
                metrics.record_retries(retries);
            }
        }
        result
    });
    settled.unwrap_or_else(|| {
        warn!(
            agent = %agent_id.short(),
            ?elapsed,
            "task outlived a forced stop; outcome discarded"
        );
        Err(AgentError::Cancelled { agent_id })
    })
}

fn settle<H, M>(
    shared: &Shared<H, M>,
    task: &H::Task,
    outcome: Result<H::Output, H::Error>,
    elapsed: Duration,
) -> AgentResult<H::Output>
where
    H: TaskHandler,
    M: OutcomeMetrics,
{
    let agent_id = shared.identity.id();
    let metrics = shared.config.metrics_enabled().then_some(&shared.metrics);
    let handler = &shared.handler;

    match outcome {
        Ok(output) => {
            if let Some(metrics) = metrics {
                metrics.record_succeeded(&OutcomeSample {
                    elapsed,
                    input_size: task.input_size(),
                    output_size: handler.estimate_output_size(&output),
                    priority: task.priority(),
                });
            }
            shared
                .memory
                .record(task.describe(), Some(output.to_string()), true, elapsed, None);
            handler.on_task_completed(task, &output);
            debug!(agent = %agent_id.short(), ?elapsed, "task completed");
            Ok(output)
        }
        Err(error) => {
            if let Some(metrics) = metrics {
                metrics.record_failed(&OutcomeSample {
                    elapsed,
                    input_size: task.input_size(),
                    output_size: 0,
                    priority: task.priority(),
                });
            }
            let learning = format!("Error: {} - {error}", error_kind::<H::Error>());
            shared
                .memory
                .record(task.describe(), None, false, elapsed, Some(learning));
            handler.on_task_failed(task, &error);
            warn!(agent = %agent_id.short(), ?elapsed, %error, "task failed");
            Err(AgentError::ProcessingFailed {
                agent_id,
                source: Box::new(error),
            })
        }
    }
}

/// Future resolving to the outcome of one submitted task.
///
/// Resolves exactly once: with the handler's output, with
/// [`AgentError::ProcessingFailed`], with [`AgentError::NotRunning`] when the
/// agent rejected the submission, or with [`AgentError::Cancelled`] when the
/// worker was aborted before the task finished. Dropping the handle does not
/// cancel the task.
#[derive(Debug)]
#[must_use = "await the handle to observe the task outcome"]
pub struct TaskHandle<O> {
    agent_id: AgentId,
    reply: oneshot::Receiver<AgentResult<O>>,
}

impl<O> TaskHandle<O> {
    pub(crate) fn channel(agent_id: AgentId) -> (Reply<O>, Self) {
        let (tx, reply) = oneshot::channel();
        (tx, Self { agent_id, reply })
    }

    pub(crate) fn resolved(agent_id: AgentId, outcome: AgentResult<O>) -> Self {
        let (tx, handle) = Self::channel(agent_id);
        let _ = tx.send(outcome);
        handle
    }

    /// Identifier of the agent the task was submitted to.
    #[must_use]
    pub const fn agent_id(&self) -> AgentId {
        self.agent_id
    }
}

impl<O> Future for TaskHandle<O> {
    type Output = AgentResult<O>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let agent_id = this.agent_id;
        Pin::new(&mut this.reply)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or_else(|_| Err(AgentError::Cancelled { agent_id })))
    }
}
