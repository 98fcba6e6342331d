use crate::cell::CellInfo;
use crate::config::RuntimeConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Result, RuntimeError};
use crate::stats::{Metrics, RuntimeStats};
use crate::sweeper::Sweeper;
use crate::table::ActivationTable;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use waypoint_core::{DurableStore, ShortKey, UrlService};

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// The short-link service: one single-writer cell per key over a durable store.
///
/// Construct with [`UrlRuntime::start`], which must be called from within a
/// Tokio runtime. The runtime owns its activation table and sweeper; there is
/// no global state, so several runtimes may share a process (or a store).
pub struct UrlRuntime {
    dispatcher: Dispatcher,
    table: Arc<ActivationTable>,
    metrics: Arc<Metrics>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl UrlRuntime {
    pub fn start<S: DurableStore>(store: S, config: RuntimeConfig) -> Self {
        Self::start_with(Arc::new(store), config)
    }

    /// Like [`start`](Self::start), for a store that is already shared.
    pub fn start_with(store: Arc<dyn DurableStore>, config: RuntimeConfig) -> Self {
        let metrics = Arc::new(Metrics::default());
        let table = Arc::new(ActivationTable::new(Arc::clone(&metrics)));
        let sweeper = Sweeper::spawn(
            Arc::clone(&table),
            config.idle_timeout,
            config.sweep_interval,
        );

        info!(
            idle_timeout = ?config.idle_timeout,
            sweep_interval = ?config.sweep_interval,
            store_timeout = ?config.store_timeout,
            release_after_write = config.release_after_write,
            "url runtime started"
        );

        let dispatcher = Dispatcher::new(Arc::clone(&table), store, config, Arc::clone(&metrics));
        Self {
            dispatcher,
            table,
            metrics,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    fn ensure_running(&self) -> Result<()> {
        if self.table.is_closed() {
            return Err(RuntimeError::ShuttingDown);
        }
        Ok(())
    }

    /// Stores `full_url` under `key`, replacing any previous value.
    ///
    /// Returns once the store has acknowledged the write. On error the key
    /// keeps whatever value it had before.
    pub async fn set_url(&self, key: &ShortKey, full_url: &str) -> Result<()> {
        self.ensure_running()?;
        self.dispatcher.set_url(key, full_url.to_owned()).await
    }

    /// Returns the URL for `key`, or `None` if it has never been set.
    pub async fn get_url(&self, key: &ShortKey) -> Result<Option<String>> {
        self.ensure_running()?;
        self.dispatcher.get_url(key).await
    }

    /// Deactivates the cell for `key` now, if it exists and is not in use.
    pub fn evict(&self, key: &ShortKey) -> bool {
        self.table.evict(key)
    }

    pub fn is_active(&self, key: &ShortKey) -> bool {
        self.table.contains(key)
    }

    pub fn active_cells(&self) -> usize {
        self.table.len()
    }

    pub fn cell_info(&self, key: &ShortKey) -> Option<CellInfo> {
        self.table.info(key)
    }

    pub fn stats(&self) -> RuntimeStats {
        self.metrics.snapshot()
    }

    pub fn config(&self) -> &RuntimeConfig {
        self.dispatcher.config()
    }

    /// Stops the runtime.
    ///
    /// New operations fail with [`RuntimeError::ShuttingDown`]. Operations
    /// already accepted keep their cell and run to completion; this returns
    /// once all of them have finished and the table is empty. Each store call
    /// is bounded by `store_timeout`, which bounds the wait. Calling this more
    /// than once is harmless.
    pub async fn shutdown(&self) {
        if !self.table.close() {
            return;
        }

        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.stop().await;
        }

        let mut dropped = self.table.drain();
        while !self.table.is_empty() {
            debug!(remaining = self.table.len(), "waiting for in-flight operations");
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
            dropped += self.table.drain();
        }
        info!(dropped, "url runtime stopped");
    }
}

impl Drop for UrlRuntime {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.abort();
        }
    }
}

#[async_trait]
impl UrlService for UrlRuntime {
    type Error = RuntimeError;

    async fn set_url(&self, key: &ShortKey, full_url: &str) -> Result<()> {
        UrlRuntime::set_url(self, key, full_url).await
    }

    async fn get_url(&self, key: &ShortKey) -> Result<Option<String>> {
        UrlRuntime::get_url(self, key).await
    }
}
