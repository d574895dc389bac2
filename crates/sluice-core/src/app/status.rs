//! Status - パイプラインのカウンタ
//!
//! Workers and the consumer loop bump these concurrently; everything else
//! only reads a snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::domain::TaskOutcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub received: u64,
    pub succeeded: u64,
    pub exhausted: u64,
    pub poison: u64,
    pub unrecognized: u64,
    pub cancelled: u64,
    pub committed: u64,
    pub commit_failures: u64,
    pub fetch_failures: u64,
}

#[derive(Debug, Default)]
pub struct ProcessorStats {
    received: AtomicU64,
    succeeded: AtomicU64,
    exhausted: AtomicU64,
    poison: AtomicU64,
    unrecognized: AtomicU64,
    cancelled: AtomicU64,
    committed: AtomicU64,
    commit_failures: AtomicU64,
    fetch_failures: AtomicU64,
}

impl ProcessorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_poison(&self) {
        self.poison.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_outcome(&self, outcome: &TaskOutcome) {
        let counter = match outcome {
            TaskOutcome::Succeeded { .. } => &self.succeeded,
            TaskOutcome::Exhausted { .. } => &self.exhausted,
            TaskOutcome::Unrecognized { .. } => &self.unrecognized,
            TaskOutcome::Cancelled { .. } => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self, ok: bool) {
        let counter = if ok { &self.committed } else { &self.commit_failures };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            poison: self.poison.load(Ordering::Relaxed),
            unrecognized: self.unrecognized.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            commit_failures: self.commit_failures.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
        }
    }
}
