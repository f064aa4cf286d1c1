//! Errors surfaced by the agent runtime.

use agent_primitives::AgentId;
use thiserror::Error;

use crate::lifecycle::AgentState;

/// Boxed error used for handler failures and lifecycle hook failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by lifecycle operations and task submissions.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The requested transition is not permitted from the current state.
    #[error("illegal transition for agent {agent_id}: {current:?} -> {attempted:?}")]
    IllegalTransition {
        /// Identifier of the agent.
        agent_id: AgentId,
        /// State at the time of the call.
        current: AgentState,
        /// State the call tried to enter.
        attempted: AgentState,
    },
    /// A lifecycle hook failed; the agent has been moved to [`AgentState::Error`].
    #[error("lifecycle hook failed for agent {agent_id} while {state:?}")]
    LifecycleHook {
        /// Identifier of the agent.
        agent_id: AgentId,
        /// Intermediate state the hook ran in.
        state: AgentState,
        /// Underlying cause.
        #[source]
        source: BoxError,
    },
    /// A task was submitted while the agent was not accepting work.
    #[error("agent {agent_id} is not running (state {state:?})")]
    NotRunning {
        /// Identifier of the agent.
        agent_id: AgentId,
        /// State at the time of submission.
        state: AgentState,
    },
    /// The task handler returned an error.
    #[error("task processing failed for agent {agent_id}")]
    ProcessingFailed {
        /// Identifier of the agent.
        agent_id: AgentId,
        /// Error returned by the handler.
        #[source]
        source: BoxError,
    },
    /// The worker went away before the task produced a result.
    #[error("task cancelled before completion for agent {agent_id}")]
    Cancelled {
        /// Identifier of the agent.
        agent_id: AgentId,
    },
}

impl AgentError {
    /// Identifier of the agent the error originated from.
    #[must_use]
    pub const fn agent_id(&self) -> AgentId {
        match self {
            Self::IllegalTransition { agent_id, .. }
            | Self::LifecycleHook { agent_id, .. }
            | Self::NotRunning { agent_id, .. }
            | Self::ProcessingFailed { agent_id, .. }
            | Self::Cancelled { agent_id } => *agent_id,
        }
    }

    /// State recorded on the error, if any.
    ///
    /// For illegal transitions this is the state at the time of the call.
    #[must_use]
    pub const fn state(&self) -> Option<AgentState> {
        match self {
            Self::IllegalTransition { current, .. } => Some(*current),
            Self::LifecycleHook { state, .. } | Self::NotRunning { state, .. } => Some(*state),
            Self::ProcessingFailed { .. } | Self::Cancelled { .. } => None,
        }
    }

    /// Attempts to downcast a processing failure to the handler's error type.
    #[must_use]
    pub fn handler_error<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::ProcessingFailed { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Result alias for runtime operations.
pub type AgentResult<T> = Result<T, AgentError>;
