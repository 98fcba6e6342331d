//! Durable store adapters for the Waypoint runtime.
//!
//! Each adapter implements [`DurableStore`] over a different backend and
//! stores records as the blobs produced by [`waypoint_core::codec`].

pub mod memory;
pub mod mysql;
pub mod redis;

pub use self::memory::InMemoryStore;
pub use self::mysql::MySqlStore;
pub use self::redis::RedisStore;
pub use waypoint_core::{DurableStore, Result, StoreError};
