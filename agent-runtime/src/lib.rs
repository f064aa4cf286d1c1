//! Runtime SDK for long-lived task-processing agents.
//!
//! Depend on this crate via `cargo add agent-runtime`. It bundles the member
//! crates behind feature flags so downstream users can enable only the
//! components their agents need.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use agent_primitives as primitives;

/// Lifecycle state machine and execution runtime (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use agent_kernel as kernel;

/// Execution history (enabled by `memory` feature).
#[cfg(feature = "memory")]
pub use agent_memory as memory;

/// Metrics and tracing bootstrap (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use agent_telemetry as telemetry;

/// Configuration management (enabled by `config` feature).
#[cfg(feature = "config")]
pub use agent_config as config;

/// Types most agents need, in one import.
#[cfg(feature = "kernel")]
pub mod prelude {
    pub use agent_config::AgentConfig;
    pub use agent_kernel::{
        AgentError, AgentResult, AgentRuntime, AgentState, ChatRuntime, TaskContext,
        TaskHandle, TaskHandler,
    };
    pub use agent_primitives::{AgentIdentity, BasicTask, TaskPriority, TaskSize, WorkItem};
    pub use agent_telemetry::{ConversationMetrics, OutcomeMetrics, TaskMetrics};
}
