//! Key-addressed single-writer runtime for short links.
//!
//! For every [`ShortKey`](waypoint_core::ShortKey) there is at most one live
//! [`StateCell`] at a time, reachable only through the [`ActivationTable`].
//! The [`Dispatcher`] activates cells on demand, loading their state from a
//! [`DurableStore`](waypoint_core::DurableStore), and runs each key's
//! operations one at a time. Writes go through to the store before they are
//! acknowledged, so the [`Sweeper`] can drop idle cells without losing data.
//!
//! [`UrlRuntime`] wires these together behind an explicit start/stop
//! lifecycle.
//!
//! # Example
//!
//! ```rust
//! use waypoint_core::ShortKey;
//! use waypoint_runtime::{RuntimeConfig, UrlRuntime};
//! use waypoint_storage::InMemoryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = UrlRuntime::start(InMemoryStore::new(), RuntimeConfig::default());
//!
//! let key = ShortKey::new("abc123");
//! runtime.set_url(&key, "https://example.com/a").await?;
//! assert_eq!(
//!     runtime.get_url(&key).await?.as_deref(),
//!     Some("https://example.com/a")
//! );
//!
//! runtime.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod cell;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod runtime;
pub mod stats;
pub mod sweeper;
pub mod table;

pub use cell::{CellHandle, CellInfo, StateCell};
pub use config::RuntimeConfig;
pub use dispatcher::Dispatcher;
pub use error::{Result, RuntimeError};
pub use runtime::UrlRuntime;
pub use stats::RuntimeStats;
pub use sweeper::Sweeper;
pub use table::ActivationTable;
