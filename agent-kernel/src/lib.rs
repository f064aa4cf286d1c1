//! Agent lifecycle state machine and execution runtime.
//!
//! An [`AgentRuntime`] owns a [`Lifecycle`], one background worker, an
//! execution history, and a metrics aggregator. Domain logic plugs in through
//! [`TaskHandler`]; callers interact through non-blocking
//! [`submit`](AgentRuntime::submit) and the `start`/`pause`/`stop`/`reset`
//! lifecycle calls.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod handler;
mod lifecycle;
mod runtime;
mod status;
mod worker;

pub use error::{AgentError, AgentResult, BoxError};
pub use handler::{TaskContext, TaskHandler};
pub use lifecycle::{AgentState, Lifecycle};
pub use runtime::{AgentRuntime, AgentRuntimeBuilder, ChatRuntime, SUMMARY_THRESHOLD};
pub use status::AgentStatus;
pub use worker::TaskHandle;
