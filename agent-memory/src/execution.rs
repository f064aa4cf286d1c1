//! Bounded execution history with compaction and summaries.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::num::NonZeroUsize;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{MemoryEntry, MemoryError, MemoryResult};

/// Capacity used by [`ExecutionMemory::default`].
pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(1000).unwrap();
/// Share of the capacity, in percent, that survives a compaction.
pub const COMPACTION_RATIO_PERCENT: usize = 70;
/// Number of recent entries listed in a generated summary.
pub const DEFAULT_SUMMARY_ENTRIES: usize = 5;

#[derive(Debug, Default)]
struct MemoryInner {
    entries: VecDeque<MemoryEntry>,
    next_id: u64,
    summary: Option<String>,
}

impl MemoryInner {
    fn compact_to(&mut self, target: usize) -> usize {
        let excess = self.entries.len().saturating_sub(target);
        self.entries.drain(..excess);
        excess
    }

    fn stats(&self) -> MemoryStats {
        let total = self.entries.len();
        let successful = self.entries.iter().filter(|e| e.is_success()).count();
        let total_duration: Duration = self.entries.iter().map(MemoryEntry::duration).sum();
        let average_duration = u32::try_from(total)
            .ok()
            .filter(|count| *count > 0)
            .map_or(Duration::ZERO, |count| total_duration / count);

        MemoryStats {
            total,
            successful,
            failed: total - successful,
            average_duration,
            has_summary: self.summary.is_some(),
        }
    }

    fn digest(&self, title: &str, recent: usize) -> String {
        let stats = self.stats();
        let skip = self.entries.len().saturating_sub(recent);
        let tail: Vec<&MemoryEntry> = self.entries.iter().skip(skip).collect();

        let mut out = String::new();
        let _ = writeln!(out, "Agent Memory Summary ({title}):");
        let _ = writeln!(out, "- Total tasks processed: {}", stats.total);
        let _ = writeln!(out, "- Success rate: {:.1}%", stats.success_rate() * 100.0);
        let _ = writeln!(out, "- Most recent {} tasks:", tail.len());
        for entry in tail {
            let outcome = if entry.is_success() { "SUCCESS" } else { "FAILED" };
            let _ = writeln!(out, "  * {outcome}: {}", entry.task());
            if let Some(learning) = entry.learning() {
                let _ = writeln!(out, "    Learning: {learning}");
            }
        }
        out
    }
}

/// Ordered, capacity-bounded history of task outcomes plus an optional summary.
///
/// All mutations go through one lock, so `len() <= capacity()` holds whenever
/// the lock is released.
#[derive(Debug)]
pub struct ExecutionMemory {
    capacity: NonZeroUsize,
    inner: RwLock<MemoryInner>,
}

impl ExecutionMemory {
    /// Creates an empty history retaining at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(MemoryInner::default()),
        }
    }

    /// Fallible variant of [`ExecutionMemory::new`] for plain integers.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidConfig`] when `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> MemoryResult<Self> {
        NonZeroUsize::new(capacity)
            .map(Self::new)
            .ok_or(MemoryError::InvalidConfig("memory capacity must be non-zero"))
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub const fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    /// Number of entries kept after a compaction: `ceil(capacity * 0.7)`, at least one.
    #[must_use]
    pub const fn compaction_target(&self) -> usize {
        let capacity = self.capacity.get();
        let target = (capacity / 100) * COMPACTION_RATIO_PERCENT
            + ((capacity % 100) * COMPACTION_RATIO_PERCENT).div_ceil(100);
        if target == 0 { 1 } else { target }
    }

    /// Appends an outcome and returns the id allocated to it.
    ///
    /// When the insert pushes the history past its capacity, it is compacted
    /// before this call returns.
    pub fn record(
        &self,
        task: impl Into<String>,
        result: Option<String>,
        success: bool,
        duration: Duration,
        learning: Option<String>,
    ) -> u64 {
        let mut guard = self.write();
        guard.next_id += 1;
        let id = guard.next_id;
        guard
            .entries
            .push_back(MemoryEntry::new(id, task.into(), result, success, duration, learning));

        if guard.entries.len() > self.capacity.get() {
            let evicted = guard.compact_to(self.compaction_target());
            debug!(evicted, retained = guard.entries.len(), "execution memory auto-compacted");
        }
        id
    }

    /// Discards the oldest entries down to [`compaction_target`](Self::compaction_target).
    ///
    /// Returns the number of evicted entries; zero when already within target.
    /// Does not touch the summary.
    pub fn compact(&self) -> usize {
        let target = self.compaction_target();
        let evicted = self.write().compact_to(target);
        if evicted > 0 {
            debug!(evicted, target, "execution memory compacted");
        }
        evicted
    }

    /// Builds a digest of the history and stores it as the summary,
    /// replacing any previous one.
    pub fn summarize(&self, title: &str, recent: usize) -> String {
        let mut guard = self.write();
        let digest = guard.digest(title, recent);
        guard.summary = Some(digest.clone());
        digest
    }

    /// Builds the same digest as [`summarize`](Self::summarize) without storing it.
    #[must_use]
    pub fn digest(&self, title: &str, recent: usize) -> String {
        self.read().digest(title, recent)
    }

    /// Entries whose task, result, or learning contains `keyword`, ignoring
    /// case, oldest first. A blank keyword matches nothing.
    #[must_use]
    pub fn find(&self, keyword: &str) -> Vec<MemoryEntry> {
        if keyword.trim().is_empty() {
            return Vec::new();
        }
        let needle = keyword.to_lowercase();
        self.read()
            .entries
            .iter()
            .filter(|entry| entry.mentions(&needle))
            .cloned()
            .collect()
    }

    /// Snapshot of every entry, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<MemoryEntry> {
        self.read().entries.iter().cloned().collect()
    }

    /// The most recent `limit` entries, oldest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<MemoryEntry> {
        let guard = self.read();
        let skip = guard.entries.len().saturating_sub(limit);
        guard.entries.iter().skip(skip).cloned().collect()
    }

    /// Removes every entry and the summary.
    pub fn clear(&self) {
        let mut guard = self.write();
        guard.entries.clear();
        guard.summary = None;
    }

    /// Current summary, if one has been stored.
    #[must_use]
    pub fn summary(&self) -> Option<String> {
        self.read().summary.clone()
    }

    /// Replaces the summary.
    pub fn set_summary(&self, summary: impl Into<String>) {
        self.write().summary = Some(summary.into());
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Returns `true` when no entries are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Aggregate statistics over the retained entries.
    #[must_use]
    pub fn stats(&self) -> MemoryStats {
        self.read().stats()
    }
}

impl Default for ExecutionMemory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Aggregates computed over the retained entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Entries currently retained.
    pub total: usize,
    /// Retained entries marked successful.
    pub successful: usize,
    /// Retained entries marked failed.
    pub failed: usize,
    /// Mean processing duration across retained entries.
    pub average_duration: Duration,
    /// Whether a summary is stored.
    pub has_summary: bool,
}

impl MemoryStats {
    /// Share of successful entries, `0.0` when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful as f64 / self.total as f64
        }
    }
}
