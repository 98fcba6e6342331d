//! Core types and traits for the Waypoint short-link service.
//!
//! This crate provides the types shared by the storage adapters and the
//! key-addressed runtime: the [`ShortKey`] address, the persisted
//! [`UrlRecord`], and the [`DurableStore`] and [`UrlService`] seams.

pub mod codec;
pub mod error;
pub mod record;
pub mod service;
pub mod short_key;
pub mod store;

pub use error::{Result, StoreError};
pub use record::UrlRecord;
pub use service::UrlService;
pub use short_key::ShortKey;
pub use store::DurableStore;
