//! The in-memory owner of one short key's state.

use crate::error::Result;
use crate::stats::Metrics;
use jiff::Timestamp;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, trace, warn};
use waypoint_core::{DurableStore, ShortKey, StoreError, UrlRecord};

#[derive(Debug)]
enum Slot {
    /// Not loaded yet, or discarded after a write whose outcome is unknown.
    Unloaded,
    /// Authoritative copy of the stored record; `None` means never set.
    Loaded(Option<UrlRecord>),
}

/// State guarded by the cell's lock.
#[derive(Debug)]
pub(crate) struct CellState {
    slot: Slot,
    dirty: bool,
}

impl CellState {
    fn new() -> Self {
        Self {
            slot: Slot::Unloaded,
            dirty: false,
        }
    }

    fn record(&self) -> Option<&UrlRecord> {
        match &self.slot {
            Slot::Loaded(record) => record.as_ref(),
            Slot::Unloaded => None,
        }
    }

    /// Loads the key's record from the store unless the cell already holds it.
    ///
    /// A failed load leaves the slot unloaded so the next operation retries.
    async fn activate(
        &mut self,
        key: &ShortKey,
        store: &dyn DurableStore,
        timeout: Duration,
        metrics: &Metrics,
    ) -> Result<()> {
        if matches!(self.slot, Slot::Loaded(_)) {
            return Ok(());
        }

        match bounded(timeout, "load", key, store.load(key)).await {
            Ok(record) => {
                debug!(key = %key, found = record.is_some(), "cell activated");
                metrics.record_activation();
                self.slot = Slot::Loaded(record);
                Ok(())
            }
            Err(e) => {
                warn!(key = %key, error = %e, "activation load failed");
                metrics.record_load_failure();
                Err(e.into())
            }
        }
    }
}

/// Runs a store call under `timeout`, reporting expiry as [`StoreError::Timeout`].
async fn bounded<T>(
    timeout: Duration,
    operation: &str,
    key: &ShortKey,
    call: impl Future<Output = waypoint_core::Result<T>>,
) -> waypoint_core::Result<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(format!(
            "{operation} for key '{key}' exceeded {timeout:?}"
        ))),
    }
}

/// One key's logical owner.
///
/// Every operation on the key takes the cell's lock, so operations are
/// applied one at a time in the order they queued for it. The cell is only
/// ever reached through a [`CellHandle`], and the activation table will not
/// drop a cell while any handle to it is alive.
#[derive(Debug)]
pub struct StateCell {
    key: ShortKey,
    state: Arc<AsyncMutex<CellState>>,
    pins: AtomicUsize,
    last_access: Mutex<Instant>,
    created_at: Timestamp,
}

impl StateCell {
    pub(crate) fn new(key: ShortKey) -> Self {
        Self {
            key,
            state: Arc::new(AsyncMutex::new(CellState::new())),
            pins: AtomicUsize::new(0),
            last_access: Mutex::new(Instant::now()),
            created_at: Timestamp::now(),
        }
    }

    pub fn key(&self) -> &ShortKey {
        &self.key
    }

    /// Number of live handles, i.e. operations queued or running on this cell.
    pub fn in_flight(&self) -> usize {
        self.pins.load(Ordering::SeqCst)
    }

    /// Time since an operation last started or finished on this cell.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_access.lock())
    }

    fn touch(&self) {
        *self.last_access.lock() = Instant::now();
    }

    /// True when no operation holds or waits for the cell and its state is clean.
    ///
    /// Callers must hold the activation table's lock for this key, which is
    /// what keeps a concurrent resolve from pinning the cell after the check.
    pub(crate) fn is_evictable(&self) -> bool {
        if self.in_flight() > 0 {
            return false;
        }
        match self.state.try_lock() {
            Ok(state) => !state.dirty,
            Err(_) => false,
        }
    }

    pub fn info(&self, now: Instant) -> CellInfo {
        CellInfo {
            key: self.key.clone(),
            created_at: self.created_at,
            in_flight: self.in_flight(),
            idle_for: self.idle_for(now),
        }
    }

    /// Returns the current URL, activating the cell first if needed.
    ///
    /// Once activated, reads are served from memory without touching the store.
    pub(crate) async fn get_url(
        &self,
        store: &dyn DurableStore,
        timeout: Duration,
        metrics: &Metrics,
    ) -> Result<Option<String>> {
        let mut state = self.state.lock().await;
        state.activate(&self.key, store, timeout, metrics).await?;

        let url = state.record().map(|record| record.full_url.clone());
        trace!(key = %self.key, found = url.is_some(), "served read from cell");
        Ok(url)
    }

    /// Queues for the cell's lock, returning a guard that can move to another task.
    pub(crate) async fn lock_owned(&self) -> OwnedMutexGuard<CellState> {
        Arc::clone(&self.state).lock_owned().await
    }
}

/// Replaces the cell's record and persists it before returning.
///
/// The in-memory record only survives if the store acknowledges the save.
/// On a definite failure the previous record is restored; on a timeout the
/// stored outcome is unknown, so the cell is unloaded and the next operation
/// reads back whatever the store actually holds.
pub(crate) async fn write_through(
    mut state: OwnedMutexGuard<CellState>,
    key: ShortKey,
    full_url: String,
    store: Arc<dyn DurableStore>,
    timeout: Duration,
    metrics: Arc<Metrics>,
) -> Result<()> {
    state
        .activate(&key, store.as_ref(), timeout, &metrics)
        .await?;

    let record = UrlRecord::new(key.clone(), full_url);
    let prior = std::mem::replace(&mut state.slot, Slot::Loaded(Some(record.clone())));
    state.dirty = true;

    let outcome = bounded(timeout, "save", &key, store.save(&key, &record)).await;
    state.dirty = false;

    match outcome {
        Ok(()) => {
            metrics.record_write();
            debug!(key = %key, url = %record.full_url, "record written through");
            Ok(())
        }
        Err(e) => {
            metrics.record_failed_write();
            if matches!(e, StoreError::Timeout(_)) {
                warn!(key = %key, error = %e, "save timed out, cell will reload");
                state.slot = Slot::Unloaded;
            } else {
                warn!(key = %key, error = %e, "save failed, rolled back");
                state.slot = prior;
            }
            Err(e.into())
        }
    }
}

/// A pinned reference to a live cell.
///
/// While a handle exists the cell cannot be evicted. Handles are created by
/// [`ActivationTable::resolve`](crate::ActivationTable::resolve) only.
#[derive(Debug)]
pub struct CellHandle {
    cell: Arc<StateCell>,
}

impl CellHandle {
    /// Pins `cell`. Must be called under the activation table's lock for the key.
    pub(crate) fn pin(cell: Arc<StateCell>) -> Self {
        cell.pins.fetch_add(1, Ordering::SeqCst);
        cell.touch();
        Self { cell }
    }

    pub fn cell(&self) -> &StateCell {
        &self.cell
    }

    pub fn key(&self) -> &ShortKey {
        self.cell.key()
    }

    /// Whether both handles point at the same cell instance.
    pub fn same_cell(&self, other: &CellHandle) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl Drop for CellHandle {
    fn drop(&mut self) {
        // Refresh before unpinning so a sweep never sees an unpinned, stale cell.
        self.cell.touch();
        self.cell.pins.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Diagnostic snapshot of one active cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellInfo {
    pub key: ShortKey,
    /// Wall-clock time the cell was created.
    pub created_at: Timestamp,
    /// Operations queued or running on the cell.
    pub in_flight: usize,
    pub idle_for: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_storage::InMemoryStore;
    use waypoint_test_infra::FlakyStore;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn key(s: &str) -> ShortKey {
        ShortKey::new(s)
    }

    fn flaky() -> FlakyStore<InMemoryStore> {
        FlakyStore::new(InMemoryStore::new())
    }

    async fn set(
        cell: &StateCell,
        store: &FlakyStore<InMemoryStore>,
        metrics: &Arc<Metrics>,
        url: &str,
    ) -> Result<()> {
        let guard = cell.lock_owned().await;
        write_through(
            guard,
            cell.key().clone(),
            url.to_string(),
            Arc::new(store.clone()),
            TIMEOUT,
            Arc::clone(metrics),
        )
        .await
    }

    #[tokio::test]
    async fn unset_key_reads_absent() {
        let store = flaky();
        let metrics = Metrics::default();
        let cell = StateCell::new(key("nope"));

        let url = cell.get_url(&store, TIMEOUT, &metrics).await.unwrap();
        assert!(url.is_none());
        assert_eq!(metrics.snapshot().activations, 1);
    }

    #[tokio::test]
    async fn activation_loads_once() {
        let store = flaky();
        store
            .save(&key("abc123"), &UrlRecord::new(key("abc123"), "https://example.com/a"))
            .await
            .unwrap();
        let metrics = Metrics::default();
        let cell = StateCell::new(key("abc123"));

        for _ in 0..3 {
            let url = cell.get_url(&store, TIMEOUT, &metrics).await.unwrap();
            assert_eq!(url.as_deref(), Some("https://example.com/a"));
        }
        assert_eq!(store.load_count(), 1);
    }

    #[tokio::test]
    async fn write_is_durable_before_returning() {
        let store = flaky();
        let metrics = Arc::new(Metrics::default());
        let cell = StateCell::new(key("abc123"));

        set(&cell, &store, &metrics, "https://example.com/a").await.unwrap();

        let stored = store.inner().load(&key("abc123")).await.unwrap().unwrap();
        assert_eq!(stored.full_url, "https://example.com/a");
        assert_eq!(stored.short_key, key("abc123"));
        assert_eq!(metrics.snapshot().writes, 1);
    }

    #[tokio::test]
    async fn failed_first_write_leaves_key_unset() {
        let store = flaky();
        let metrics = Arc::new(Metrics::default());
        let cell = StateCell::new(key("abc123"));

        store.fail_saves(true);
        let err = set(&cell, &store, &metrics, "https://example.com/a")
            .await
            .unwrap_err();
        assert!(err.is_transient());

        let url = cell.get_url(&store, TIMEOUT, &metrics).await.unwrap();
        assert!(url.is_none());
        assert_eq!(metrics.snapshot().failed_writes, 1);
    }

    #[tokio::test]
    async fn failed_overwrite_restores_prior_value() {
        let store = flaky();
        let metrics = Arc::new(Metrics::default());
        let cell = StateCell::new(key("abc123"));

        set(&cell, &store, &metrics, "https://example.com/a").await.unwrap();
        store.fail_saves(true);
        set(&cell, &store, &metrics, "https://example.com/b")
            .await
            .unwrap_err();

        let url = cell.get_url(&store, TIMEOUT, &metrics).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://example.com/a"));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_write_reloads_from_store() {
        let store = flaky();
        let metrics = Arc::new(Metrics::default());
        let cell = StateCell::new(key("abc123"));

        set(&cell, &store, &metrics, "https://example.com/a").await.unwrap();
        assert_eq!(store.load_count(), 1);

        store.delay_saves(Some(TIMEOUT * 2));
        let err = set(&cell, &store, &metrics, "https://example.com/b")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::RuntimeError::Persistence(StoreError::Timeout(_))
        ));

        // The next read goes back to the store rather than trusting memory.
        store.delay_saves(None);
        let url = cell.get_url(&store, TIMEOUT, &metrics).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://example.com/a"));
        assert_eq!(store.load_count(), 2);
    }

    #[tokio::test]
    async fn failed_activation_is_retried() {
        let store = flaky();
        let metrics = Metrics::default();
        let cell = StateCell::new(key("abc123"));

        store.fail_loads(true);
        assert!(cell.get_url(&store, TIMEOUT, &metrics).await.is_err());

        store.fail_loads(false);
        assert!(cell.get_url(&store, TIMEOUT, &metrics).await.unwrap().is_none());
        assert_eq!(store.load_count(), 2);

        let stats = metrics.snapshot();
        assert_eq!(stats.load_failures, 1);
        assert_eq!(stats.activations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_activation_is_retried() {
        let store = flaky();
        store
            .save(&key("abc123"), &UrlRecord::new(key("abc123"), "https://example.com/a"))
            .await
            .unwrap();
        let metrics = Metrics::default();
        let cell = StateCell::new(key("abc123"));

        store.delay_loads(Some(TIMEOUT * 2));
        let err = cell.get_url(&store, TIMEOUT, &metrics).await.unwrap_err();
        assert!(matches!(
            err,
            crate::RuntimeError::Persistence(StoreError::Timeout(_))
        ));
        assert!(err.is_transient());

        store.delay_loads(None);
        let url = cell.get_url(&store, TIMEOUT, &metrics).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://example.com/a"));

        let stats = metrics.snapshot();
        assert_eq!(stats.load_failures, 1);
        assert_eq!(stats.activations, 1);
        assert_eq!(store.load_count(), 2);
    }

    #[tokio::test]
    async fn handles_pin_the_cell() {
        let cell = Arc::new(StateCell::new(key("abc123")));
        assert!(cell.is_evictable());

        let first = CellHandle::pin(Arc::clone(&cell));
        let second = CellHandle::pin(Arc::clone(&cell));
        assert_eq!(cell.in_flight(), 2);
        assert!(first.same_cell(&second));
        assert!(!cell.is_evictable());

        drop(first);
        drop(second);
        assert_eq!(cell.in_flight(), 0);
        assert!(cell.is_evictable());
    }

    #[tokio::test]
    async fn locked_cell_is_not_evictable() {
        let cell = StateCell::new(key("abc123"));
        let _guard = cell.lock_owned().await;
        assert!(!cell.is_evictable());
    }
}
