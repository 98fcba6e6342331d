use crate::table::ActivationTable;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Background task that periodically drops idle cells from the table.
///
/// Dropping a cell loses nothing: every acknowledged write is already in the
/// store, and the next operation on the key reactivates it from there.
#[derive(Debug)]
pub struct Sweeper {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Starts sweeping `table` every `interval`, evicting cells idle for at
    /// least `idle_timeout`. The first sweep runs one interval after spawn.
    pub fn spawn(table: Arc<ActivationTable>, idle_timeout: Duration, interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            info!(?idle_timeout, ?interval, "eviction sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = table.sweep(idle_timeout);
                        if removed > 0 {
                            debug!(removed, remaining = table.len(), "swept idle cells");
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("eviction sweeper stopped");
        });

        Self { stop_tx, handle }
    }

    /// Signals the sweeper to stop and waits for it to finish its current pass.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.handle.await;
    }

    /// Cancels the sweeper without waiting.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
