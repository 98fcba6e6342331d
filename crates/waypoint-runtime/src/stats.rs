use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the table, the cells, and the sweeper.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    activations: AtomicU64,
    load_failures: AtomicU64,
    writes: AtomicU64,
    failed_writes: AtomicU64,
    evictions: AtomicU64,
}

impl Metrics {
    pub(crate) fn record_activation(&self) {
        self.activations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_write(&self) {
        self.failed_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RuntimeStats {
        RuntimeStats {
            activations: self.activations.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            failed_writes: self.failed_writes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of the runtime's counters.
///
/// All counters only grow over the lifetime of a runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Cells whose state was successfully loaded from the store.
    pub activations: u64,
    /// Activation loads that failed or timed out.
    pub load_failures: u64,
    /// Writes acknowledged by the store.
    pub writes: u64,
    /// Writes that failed or timed out and were rolled back.
    pub failed_writes: u64,
    /// Cells removed from the activation table.
    pub evictions: u64,
}
