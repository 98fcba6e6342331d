use crate::error::Result;
use crate::record::UrlRecord;
use crate::short_key::ShortKey;
use async_trait::async_trait;
use std::sync::Arc;

/// Key-addressed persistence for [`UrlRecord`]s.
///
/// Implementations can use Redis, MySQL, an in-memory map, or any other
/// backend that offers atomic single-key writes.
#[async_trait]
pub trait DurableStore: Send + Sync + 'static {
    /// Loads the record stored for `key`.
    ///
    /// Returns `Ok(None)` if nothing has ever been saved for the key.
    async fn load(&self, key: &ShortKey) -> Result<Option<UrlRecord>>;

    /// Replaces the record stored for `key`.
    ///
    /// The write either fully applies or not at all; a subsequent `load`
    /// never observes a partial record. Failures are reported, not retried.
    async fn save(&self, key: &ShortKey, record: &UrlRecord) -> Result<()>;
}

#[async_trait]
impl<S: DurableStore + ?Sized> DurableStore for Arc<S> {
    async fn load(&self, key: &ShortKey) -> Result<Option<UrlRecord>> {
        (**self).load(key).await
    }

    async fn save(&self, key: &ShortKey, record: &UrlRecord) -> Result<()> {
        (**self).save(key, record).await
    }
}
