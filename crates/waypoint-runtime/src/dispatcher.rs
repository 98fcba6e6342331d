use crate::cell::write_through;
use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::stats::Metrics;
use crate::table::ActivationTable;
use std::sync::Arc;
use tracing::{instrument, trace, warn};
use waypoint_core::{DurableStore, ShortKey};

/// Routes operations to the owning cell of their key.
///
/// Each call resolves the key's cell (creating it on a miss), waits its turn
/// on the cell's lock, and runs against the cell. The lock queue is first in,
/// first out, so a key's operations take effect in the order they reached
/// the dispatcher. Calls for different keys share nothing but the table.
pub struct Dispatcher {
    table: Arc<ActivationTable>,
    store: Arc<dyn DurableStore>,
    config: RuntimeConfig,
    metrics: Arc<Metrics>,
}

impl Dispatcher {
    pub(crate) fn new(
        table: Arc<ActivationTable>,
        store: Arc<dyn DurableStore>,
        config: RuntimeConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            table,
            store,
            config,
            metrics,
        }
    }

    pub fn table(&self) -> &ActivationTable {
        &self.table
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Returns the URL stored for `key`, or `None` if it was never set.
    #[instrument(skip(self), fields(key = %key), level = "debug")]
    pub async fn get_url(&self, key: &ShortKey) -> Result<Option<String>> {
        let handle = self.table.resolve(key)?;
        handle
            .cell()
            .get_url(self.store.as_ref(), self.config.store_timeout, &self.metrics)
            .await
    }

    /// Sets the URL for `key` and waits until the store has acknowledged it.
    ///
    /// Once this call holds the key's lock, the write runs to completion on a
    /// separate task. Dropping the returned future before then abandons the
    /// request cleanly; dropping it after only stops waiting for the result,
    /// and the cell still ends up matching whatever the store acknowledged.
    #[instrument(skip(self, full_url), fields(key = %key), level = "debug")]
    pub async fn set_url(&self, key: &ShortKey, full_url: String) -> Result<()> {
        let handle = self.table.resolve(key)?;
        let guard = handle.cell().lock_owned().await;

        let store = Arc::clone(&self.store);
        let metrics = Arc::clone(&self.metrics);
        let timeout = self.config.store_timeout;
        let owned_key = key.clone();
        let write = tokio::spawn(async move {
            let result = write_through(guard, owned_key, full_url, store, timeout, metrics).await;
            drop(handle);
            result
        });

        let result = write.await.map_err(|e| {
            warn!(key = %key, error = %e, "write task did not complete");
            RuntimeError::Interrupted(key.to_string())
        })?;

        if result.is_ok() && self.config.release_after_write && self.table.evict(key) {
            trace!(key = %key, "released cell after write");
        }
        result
    }
}
