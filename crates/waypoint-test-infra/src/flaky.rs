//! A fault-injecting [`DurableStore`] wrapper for exercising failure paths.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use waypoint_core::{DurableStore, Result, ShortKey, StoreError, UrlRecord};

#[derive(Default)]
struct Faults {
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    loads: AtomicUsize,
    saves_started: AtomicUsize,
    saves: AtomicUsize,
    load_delay: Mutex<Option<Duration>>,
    save_delay: Mutex<Option<Duration>>,
    save_gate: Mutex<Option<Arc<Semaphore>>>,
}

/// Wraps a store and lets a test fail, delay, or hold its operations.
///
/// Clones share the same fault switches and counters.
#[derive(Clone)]
pub struct FlakyStore<S> {
    inner: S,
    faults: Arc<Faults>,
}

impl<S: DurableStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Arc::new(Faults::default()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Makes every subsequent `load` fail with [`StoreError::Unavailable`].
    pub fn fail_loads(&self, fail: bool) {
        self.faults.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `save` fail with [`StoreError::Unavailable`].
    pub fn fail_saves(&self, fail: bool) {
        self.faults.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Delays every subsequent `load` by `delay` before it reaches the inner store.
    pub fn delay_loads(&self, delay: Option<Duration>) {
        *self.faults.load_delay.lock() = delay;
    }

    /// Delays every subsequent `save` by `delay` before it reaches the inner store.
    pub fn delay_saves(&self, delay: Option<Duration>) {
        *self.faults.save_delay.lock() = delay;
    }

    /// Blocks saves until [`release_saves`](Self::release_saves) is called.
    pub fn hold_saves(&self) {
        *self.faults.save_gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Lets held and future saves through.
    pub fn release_saves(&self) {
        if let Some(gate) = self.faults.save_gate.lock().take() {
            gate.close();
        }
    }

    /// Number of `load` calls that reached the wrapper.
    pub fn load_count(&self) -> usize {
        self.faults.loads.load(Ordering::SeqCst)
    }

    /// Number of `save` calls that have started, including held ones.
    pub fn saves_started(&self) -> usize {
        self.faults.saves_started.load(Ordering::SeqCst)
    }

    /// Number of `save` calls acknowledged by the inner store.
    pub fn save_count(&self) -> usize {
        self.faults.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: DurableStore> DurableStore for FlakyStore<S> {
    async fn load(&self, key: &ShortKey) -> Result<Option<UrlRecord>> {
        self.faults.loads.fetch_add(1, Ordering::SeqCst);

        let delay = *self.faults.load_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.faults.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("injected load failure for '{key}'")));
        }
        self.inner.load(key).await
    }

    async fn save(&self, key: &ShortKey, record: &UrlRecord) -> Result<()> {
        self.faults.saves_started.fetch_add(1, Ordering::SeqCst);

        let gate = self.faults.save_gate.lock().clone();
        if let Some(gate) = gate {
            // A closed semaphore is the release signal.
            let _ = gate.acquire().await;
        }

        let delay = *self.faults.save_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.faults.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("injected save failure for '{key}'")));
        }

        self.inner.save(key, record).await?;
        self.faults.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
