//! Serializable status report for health and status endpoints.

use std::fmt;

use agent_memory::MemoryStats;
use agent_primitives::AgentIdentity;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::lifecycle::AgentState;

/// Point-in-time view of an agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus<S> {
    /// Identity of the agent.
    pub identity: AgentIdentity,
    /// Lifecycle state when the report was taken.
    pub state: AgentState,
    /// Whether task outcomes feed the metrics.
    pub metrics_enabled: bool,
    /// Metrics snapshot.
    pub metrics: S,
    /// Statistics over the execution history.
    pub memory: MemoryStats,
    /// When the report was taken.
    pub reported_at: DateTime<Utc>,
}

impl<S> AgentStatus<S> {
    pub(crate) fn new(
        identity: AgentIdentity,
        state: AgentState,
        metrics_enabled: bool,
        metrics: S,
        memory: MemoryStats,
    ) -> Self {
        Self {
            identity,
            state,
            metrics_enabled,
            metrics,
            memory,
            reported_at: Utc::now(),
        }
    }

    /// Returns `true` unless the agent is in [`AgentState::Error`].
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.state != AgentState::Error
    }
}

impl<S> fmt::Display for AgentStatus<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v{} [{}]: {} ({}), {} entries in memory",
            self.identity.name(),
            self.identity.version(),
            self.identity.id().short(),
            self.state,
            self.state.description(),
            self.memory.total,
        )
    }
}
