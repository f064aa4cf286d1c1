//! Execution history for agents.
//!
//! Every finished task leaves exactly one [`MemoryEntry`] behind. The
//! [`ExecutionMemory`] that holds them is bounded: once an insert would exceed
//! the capacity the oldest entries are discarded before the insert returns.

#![warn(missing_docs, clippy::pedantic)]

mod entry;
mod error;
mod execution;

pub use entry::MemoryEntry;
pub use error::{MemoryError, MemoryResult};
pub use execution::{
    ExecutionMemory, MemoryStats, COMPACTION_RATIO_PERCENT, DEFAULT_CAPACITY,
    DEFAULT_SUMMARY_ENTRIES,
};
