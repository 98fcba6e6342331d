use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;
use waypoint_core::codec;
use waypoint_core::{DurableStore, Result, ShortKey, UrlRecord};

/// In-memory implementation of [`DurableStore`] using DashMap.
///
/// Records are kept as encoded blobs, exactly as a remote backend would hold
/// them. Clones share the same map, so a store outlives any runtime built on
/// top of it; that is what lets tests restart a runtime and observe recovery.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    blobs: Arc<DashMap<ShortKey, Vec<u8>>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            blobs: Arc::new(DashMap::with_capacity(capacity)),
        }
    }

    /// Number of keys with a stored record.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Overwrites the raw blob for `key`, bypassing encoding.
    pub fn put_raw(&self, key: &ShortKey, blob: impl Into<Vec<u8>>) {
        self.blobs.insert(key.clone(), blob.into());
    }
}

#[async_trait]
impl DurableStore for InMemoryStore {
    async fn load(&self, key: &ShortKey) -> Result<Option<UrlRecord>> {
        trace!(key = %key, "loading record from memory");

        let Some(blob) = self.blobs.get(key) else {
            return Ok(None);
        };

        codec::decode(key, &blob).map(Some)
    }

    async fn save(&self, key: &ShortKey, record: &UrlRecord) -> Result<()> {
        trace!(key = %key, "saving record to memory");

        // Encode before touching the map so a failed encode leaves the old blob.
        let blob = codec::encode(record)?;
        self.blobs.insert(key.clone(), blob);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::StoreError;

    fn key(s: &str) -> ShortKey {
        ShortKey::new(s)
    }

    fn record(k: &str, url: &str) -> UrlRecord {
        UrlRecord::new(key(k), url)
    }

    #[tokio::test]
    async fn save_and_load() {
        let store = InMemoryStore::new();

        store
            .save(&key("abc123"), &record("abc123", "https://example.com"))
            .await
            .unwrap();

        let loaded = store.load(&key("abc123")).await.unwrap().unwrap();
        assert_eq!(loaded.full_url, "https://example.com");
        assert_eq!(loaded.short_key, key("abc123"));
    }

    #[tokio::test]
    async fn load_missing_is_none() {
        let store = InMemoryStore::new();
        assert!(store.load(&key("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_overwrites() {
        let store = InMemoryStore::new();

        store
            .save(&key("abc123"), &record("abc123", "https://old.com"))
            .await
            .unwrap();
        store
            .save(&key("abc123"), &record("abc123", "https://new.com"))
            .await
            .unwrap();

        let loaded = store.load(&key("abc123")).await.unwrap().unwrap();
        assert_eq!(loaded.full_url, "https://new.com");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn clones_share_records() {
        let store = InMemoryStore::new();
        let other = store.clone();

        store
            .save(&key("abc123"), &record("abc123", "https://example.com"))
            .await
            .unwrap();

        assert!(other.load(&key("abc123")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupt_blob_is_invalid_data() {
        let store = InMemoryStore::new();
        store.put_raw(&key("abc123"), b"{not json".to_vec());

        let err = store.load(&key("abc123")).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[tokio::test]
    async fn concurrent_access() {
        let store = InMemoryStore::new();
        let mut handles = vec![];

        for i in 0..10u64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let k = key(&format!("key-{i:03}"));
                let r = UrlRecord::new(k.clone(), format!("https://example{i}.com"));
                store.save(&k, &r).await.unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..10u64 {
            let loaded = store
                .load(&key(&format!("key-{i:03}")))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(loaded.full_url, format!("https://example{i}.com"));
        }
    }
}
