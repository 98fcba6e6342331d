//! Test fixtures shared across Waypoint crates.

pub mod error;
pub mod flaky;
pub mod mysql;
pub mod redis;

pub use error::{Result, TestInfraError};
pub use flaky::FlakyStore;
