//! Per-pool operation counters.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct PoolCounters {
    admitted: AtomicUsize,
    rejected: AtomicUsize,
    failed: AtomicUsize,
    batches: AtomicUsize,
    batch_failures: AtomicUsize,
    shutdown_fallbacks: AtomicUsize,
}

impl PoolCounters {
    pub fn admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batch_started(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batch_failed(&self) {
        self.batch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn shutdown_fallback(&self) {
        self.shutdown_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            admitted_total: self.admitted.load(Ordering::Relaxed),
            rejected_total: self.rejected.load(Ordering::Relaxed),
            failed_total: self.failed.load(Ordering::Relaxed),
            batches_total: self.batches.load(Ordering::Relaxed),
            batch_failures_total: self.batch_failures.load(Ordering::Relaxed),
            shutdown_fallbacks_total: self.shutdown_fallbacks.load(Ordering::Relaxed),
        }
    }

    pub fn log_snapshot(&self, context: &str) {
        let s = self.snapshot();
        tracing::info!(
            context = context,
            admitted_total = s.admitted_total,
            rejected_total = s.rejected_total,
            failed_total = s.failed_total,
            batches_total = s.batches_total,
            batch_failures_total = s.batch_failures_total,
            shutdown_fallbacks_total = s.shutdown_fallbacks_total,
            "pool_counters_snapshot"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub admitted_total: usize,
    pub rejected_total: usize,
    pub failed_total: usize,
    pub batches_total: usize,
    pub batch_failures_total: usize,
    pub shutdown_fallbacks_total: usize,
}
