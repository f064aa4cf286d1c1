//! Counters shared by every aggregator: throughput, outcome counts, timing.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ratio;

const NO_STAMP: i64 = i64::MIN;

#[derive(Debug)]
pub(crate) struct Stamp(AtomicI64);

impl Stamp {
    pub(crate) const fn empty() -> Self {
        Self(AtomicI64::new(NO_STAMP))
    }

    pub(crate) fn mark_now(&self) {
        self.0.store(Utc::now().timestamp_micros(), Ordering::Relaxed);
    }

    pub(crate) fn clear(&self) {
        self.0.store(NO_STAMP, Ordering::Relaxed);
    }

    pub(crate) fn get(&self) -> Option<DateTime<Utc>> {
        match self.0.load(Ordering::Relaxed) {
            NO_STAMP => None,
            micros => DateTime::from_timestamp_micros(micros),
        }
    }
}

fn nanos(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
}

/// Raw operation counters. Callers hold the owning aggregator's gate.
#[derive(Debug)]
pub(crate) struct Operations {
    processed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    total_nanos: AtomicU64,
    min_nanos: AtomicU64,
    max_nanos: AtomicU64,
    last_started: Stamp,
    last_finished: Stamp,
    created_at: DateTime<Utc>,
    created: Instant,
}

impl Default for Operations {
    fn default() -> Self {
        Self {
            processed: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
            min_nanos: AtomicU64::new(u64::MAX),
            max_nanos: AtomicU64::new(0),
            last_started: Stamp::empty(),
            last_finished: Stamp::empty(),
            created_at: Utc::now(),
            created: Instant::now(),
        }
    }
}

impl Operations {
    pub(crate) fn started(&self) {
        self.last_started.mark_now();
    }

    pub(crate) fn succeeded(&self, elapsed: Duration) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.finished(elapsed);
    }

    pub(crate) fn failed(&self, elapsed: Duration) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.finished(elapsed);
    }

    fn finished(&self, elapsed: Duration) {
        let elapsed = nanos(elapsed);
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(elapsed, Ordering::Relaxed);
        self.min_nanos.fetch_min(elapsed, Ordering::Relaxed);
        self.max_nanos.fetch_max(elapsed, Ordering::Relaxed);
        self.last_finished.mark_now();
    }

    pub(crate) fn reset(&self) {
        self.processed.store(0, Ordering::Relaxed);
        self.succeeded.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.total_nanos.store(0, Ordering::Relaxed);
        self.min_nanos.store(u64::MAX, Ordering::Relaxed);
        self.max_nanos.store(0, Ordering::Relaxed);
        self.last_started.clear();
        self.last_finished.clear();
    }

    pub(crate) fn snapshot(&self) -> OperationSnapshot {
        let min = self.min_nanos.load(Ordering::Relaxed);
        OperationSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            total_duration: Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed)),
            min_duration: if min == u64::MAX {
                Duration::ZERO
            } else {
                Duration::from_nanos(min)
            },
            max_duration: Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed)),
            last_started_at: self.last_started.get(),
            last_finished_at: self.last_finished.get(),
            created_at: self.created_at,
            uptime: self.created.elapsed(),
        }
    }
}

/// Point-in-time view of the operation counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSnapshot {
    /// Operations that finished, successfully or not.
    pub processed: u64,
    /// Operations that finished successfully.
    pub succeeded: u64,
    /// Operations that failed.
    pub failed: u64,
    /// Sum of processing durations.
    pub total_duration: Duration,
    /// Shortest processing duration; zero before the first operation.
    pub min_duration: Duration,
    /// Longest processing duration.
    pub max_duration: Duration,
    /// When the most recent operation started.
    pub last_started_at: Option<DateTime<Utc>>,
    /// When the most recent operation finished.
    pub last_finished_at: Option<DateTime<Utc>>,
    /// When the aggregator was created; not affected by resets.
    pub created_at: DateTime<Utc>,
    /// Time since the aggregator was created.
    pub uptime: Duration,
}

impl OperationSnapshot {
    /// `succeeded / processed`, `0.0` before the first operation.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        ratio(self.succeeded, self.processed)
    }

    /// `failed / processed`, `0.0` before the first operation.
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        ratio(self.failed, self.processed)
    }

    /// Mean processing duration.
    #[must_use]
    pub fn average_duration(&self) -> Duration {
        match u32::try_from(self.processed) {
            Ok(0) => Duration::ZERO,
            Ok(count) => self.total_duration / count,
            Err(_) => {
                let nanos = self.total_duration.as_nanos() / u128::from(self.processed);
                Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
            }
        }
    }

    /// Operations per second of uptime.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if self.processed == 0 || seconds <= 0.0 {
            0.0
        } else {
            self.processed as f64 / seconds
        }
    }
}
