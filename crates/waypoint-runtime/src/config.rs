use std::time::Duration;
use typed_builder::TypedBuilder;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tuning for a [`UrlRuntime`](crate::UrlRuntime).
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use waypoint_runtime::RuntimeConfig;
///
/// let config = RuntimeConfig::builder()
///     .idle_timeout(Duration::from_secs(60))
///     .store_timeout(Duration::from_millis(500))
///     .build();
/// assert!(!config.release_after_write);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct RuntimeConfig {
    /// How long a cell may go without an operation before the sweeper drops it.
    #[builder(default = DEFAULT_IDLE_TIMEOUT)]
    pub idle_timeout: Duration,

    /// How often the sweeper scans the activation table.
    #[builder(default = DEFAULT_SWEEP_INTERVAL)]
    pub sweep_interval: Duration,

    /// Upper bound for a single store `load` or `save`.
    #[builder(default = DEFAULT_STORE_TIMEOUT)]
    pub store_timeout: Duration,

    /// Drop a cell as soon as its write completes instead of caching it.
    #[builder(default = false)]
    pub release_after_write: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
