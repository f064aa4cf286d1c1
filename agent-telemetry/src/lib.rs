//! Observability utilities for agents.
//!
//! [`metrics`] holds the thread-safe aggregators the runtime feeds on every
//! task outcome; [`tracing_support`] installs a `tracing` subscriber for
//! binaries that embed the runtime.

#![warn(missing_docs, clippy::pedantic)]

pub mod metrics;
pub mod tracing_support;

pub use metrics::{
    ConversationMetrics, ConversationSnapshot, MessageCounts, OperationSnapshot,
    OutcomeMetrics, OutcomeSample, TaskMetrics, TaskMetricsSnapshot,
};
pub use tracing_support::{init_tracing, TelemetryError};
