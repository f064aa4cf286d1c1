//! Lifecycle state machine for task-processing agents.

use std::fmt;

use agent_primitives::AgentId;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{AgentError, AgentResult};

/// States an agent can occupy during its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentState {
    /// Constructed, or freshly reset; not accepting work.
    Created,
    /// Provisioning the worker.
    Starting,
    /// Accepting and processing tasks.
    Started,
    /// Transitioning into [`AgentState::Paused`].
    Pausing,
    /// Worker kept alive but submissions are rejected.
    Paused,
    /// Draining and tearing down the worker.
    Stopping,
    /// Worker torn down; only a reset leaves this state.
    Stopped,
    /// A lifecycle hook failed; only a reset leaves this state.
    Error,
    /// Clearing metrics and memory.
    Resetting,
}

impl AgentState {
    /// Every state, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Created,
        Self::Starting,
        Self::Started,
        Self::Pausing,
        Self::Paused,
        Self::Stopping,
        Self::Stopped,
        Self::Error,
        Self::Resetting,
    ];

    /// Returns `true` when moving from `self` to `target` is a legal edge.
    #[must_use]
    pub const fn can_transition(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Created, Self::Starting | Self::Error)
                | (Self::Starting, Self::Started | Self::Error)
                | (Self::Started, Self::Pausing | Self::Stopping | Self::Error)
                | (Self::Pausing, Self::Paused | Self::Error)
                | (Self::Paused, Self::Starting | Self::Stopping | Self::Error)
                | (Self::Stopping, Self::Stopped | Self::Error)
                | (Self::Stopped, Self::Resetting | Self::Error)
                | (Self::Error, Self::Resetting)
                | (Self::Resetting, Self::Created | Self::Error)
        )
    }

    /// Returns `true` only for [`AgentState::Started`].
    #[must_use]
    pub const fn can_process_tasks(self) -> bool {
        matches!(self, Self::Started)
    }

    /// Returns `true` for the intermediate "-ing" states.
    #[must_use]
    pub const fn is_transitional(self) -> bool {
        matches!(
            self,
            Self::Starting | Self::Pausing | Self::Stopping | Self::Resetting
        )
    }

    /// Returns `true` for states that only a reset can leave.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Error)
    }

    /// Human readable description of the state.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Created => "Agent has been created but not started",
            Self::Starting => "Agent is starting up",
            Self::Started => "Agent is running and can process tasks",
            Self::Pausing => "Agent is pausing",
            Self::Paused => "Agent is paused and not accepting tasks",
            Self::Stopping => "Agent is shutting down",
            Self::Stopped => "Agent has been stopped",
            Self::Error => "Agent has encountered an error",
            Self::Resetting => "Agent is resetting",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Lifecycle state holder for one agent.
///
/// Reads never block. Writers are expected to be serialized by the owner;
/// every validated write goes through [`AgentState::can_transition`].
#[derive(Debug)]
pub struct Lifecycle {
    agent_id: AgentId,
    state: watch::Sender<AgentState>,
}

impl Lifecycle {
    /// Constructs a lifecycle in [`AgentState::Created`].
    #[must_use]
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            state: watch::Sender::new(AgentState::Created),
        }
    }

    /// Returns the owning agent identifier.
    #[must_use]
    pub const fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> AgentState {
        *self.state.borrow()
    }

    /// Returns a receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AgentState> {
        self.state.subscribe()
    }

    /// Moves to `target`, returning the previous state.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::IllegalTransition`] when the edge is not in the
    /// transition table; the state is left untouched.
    pub fn transition(&self, target: AgentState) -> AgentResult<AgentState> {
        let current = self.state();
        if !current.can_transition(target) {
            return Err(AgentError::IllegalTransition {
                agent_id: self.agent_id,
                current,
                attempted: target,
            });
        }
        Ok(self.replace(target))
    }

    /// Moves to `target` without consulting the table, returning the previous state.
    pub(crate) fn force(&self, target: AgentState) -> AgentState {
        self.replace(target)
    }

    fn replace(&self, next: AgentState) -> AgentState {
        let previous = self.state.send_replace(next);
        debug!(agent_id = %self.agent_id, ?previous, ?next, "agent lifecycle transition");
        previous
    }
}
