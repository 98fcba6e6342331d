use crate::cell::{CellHandle, CellInfo, StateCell};
use crate::error::{Result, RuntimeError};
use crate::stats::Metrics;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};
use waypoint_core::ShortKey;

/// Process-wide registry of live cells, at most one per key.
///
/// DashMap shards its locks, so operations on keys in different shards never
/// contend here, and contention within a shard lasts only for the map
/// operation itself: no lock on the table is held across an await point.
///
/// Pinning a cell ([`resolve`](Self::resolve)) and removing one
/// ([`evict`](Self::evict), [`sweep`](Self::sweep)) both run under the
/// shard lock for the key. That is what makes "unpinned" a stable fact for
/// the duration of an eviction check.
///
/// Once [`close`](Self::close)d the table hands out no more handles. Cells
/// already pinned stay until their handles drop, and
/// [`drain`](Self::drain) removes them as they become free.
#[derive(Debug)]
pub struct ActivationTable {
    cells: DashMap<ShortKey, Arc<StateCell>>,
    closed: AtomicBool,
    metrics: Arc<Metrics>,
}

impl ActivationTable {
    pub(crate) fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            cells: DashMap::new(),
            closed: AtomicBool::new(false),
            metrics,
        }
    }

    /// Returns a pinned handle to the single live cell for `key`.
    ///
    /// If no cell exists one is created in place; concurrent callers for the
    /// same unseen key all receive the cell the first of them inserted. The
    /// new cell loads its state on the first operation that locks it.
    ///
    /// Fails with [`RuntimeError::ShuttingDown`] once the table is closed.
    pub fn resolve(&self, key: &ShortKey) -> Result<CellHandle> {
        if self.is_closed() {
            return Err(RuntimeError::ShuttingDown);
        }

        let handle = self.pin(key);

        // A close that raced with the pin must not see this handle run. Back
        // out so the drain can remove the cell.
        if self.is_closed() {
            drop(handle);
            self.evict(key);
            return Err(RuntimeError::ShuttingDown);
        }
        Ok(handle)
    }

    fn pin(&self, key: &ShortKey) -> CellHandle {
        let mut created = false;
        let entry = self.cells.entry(key.clone()).or_insert_with(|| {
            created = true;
            Arc::new(StateCell::new(key.clone()))
        });
        let handle = CellHandle::pin(Arc::clone(entry.value()));
        drop(entry);

        if created {
            debug!(key = %key, "cell created");
        } else {
            trace!(key = %key, "cell resolved");
        }
        handle
    }

    /// Removes the cell for `key` if it exists and nothing is using it.
    ///
    /// Returns `true` when a cell was removed. A cell with an operation
    /// queued or running is left in place.
    pub fn evict(&self, key: &ShortKey) -> bool {
        let removed = self
            .cells
            .remove_if(key, |_, cell| cell.is_evictable())
            .is_some();

        if removed {
            self.metrics.record_evictions(1);
            debug!(key = %key, "cell evicted");
        }
        removed
    }

    /// Removes every unused cell idle for at least `idle_timeout`.
    ///
    /// Returns the number of cells removed.
    pub fn sweep(&self, idle_timeout: Duration) -> usize {
        let now = Instant::now();
        let mut removed = 0usize;

        self.cells.retain(|key, cell| {
            let expired = cell.idle_for(now) >= idle_timeout && cell.is_evictable();
            if expired {
                trace!(key = %key, "sweeping idle cell");
                removed += 1;
            }
            !expired
        });

        if removed > 0 {
            self.metrics.record_evictions(removed as u64);
        }
        removed
    }

    /// Stops handing out handles. Returns `false` if already closed.
    pub(crate) fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Removes every cell that is not in use, regardless of idle time.
    ///
    /// Returns the number of cells removed.
    pub(crate) fn drain(&self) -> usize {
        self.sweep(Duration::ZERO)
    }

    pub fn contains(&self, key: &ShortKey) -> bool {
        self.cells.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn info(&self, key: &ShortKey) -> Option<CellInfo> {
        self.cells
            .get(key)
            .map(|cell| cell.info(Instant::now()))
    }
}
