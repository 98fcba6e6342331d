use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, trace, warn};
use waypoint_core::codec::{self, DEFAULT_KEY_PREFIX};
use waypoint_core::{DurableStore, Result, ShortKey, StoreError, UrlRecord};

/// A Redis-backed implementation of [`DurableStore`].
///
/// Each record is a single string value holding the encoded blob, stored
/// under `<prefix><short key>`. A Redis `SET` replaces the value atomically,
/// which is all the single-key write contract asks for.
#[derive(Debug, Clone)]
pub struct RedisStore {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> StoreError {
    let message = format!("{operation}: {err}");
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("timed out") {
        StoreError::Timeout(message)
    } else if lowered.contains("connection") || lowered.contains("broken pipe") {
        StoreError::Unavailable(message)
    } else {
        StoreError::Operation(message)
    }
}

impl RedisStore {
    /// Creates a new Redis store using the default key prefix.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_prefix(conn, DEFAULT_KEY_PREFIX)
    }

    /// Creates a new Redis store with a custom key prefix.
    ///
    /// # Arguments
    ///
    /// * `conn` - A multiplexed Redis connection
    /// * `key_prefix` - Prefix for storage keys (e.g., "myapp:url:")
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    /// Opens a client for `redis_url` and creates a store on a new connection.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        Self::connect_with_prefix(redis_url, DEFAULT_KEY_PREFIX).await
    }

    pub async fn connect_with_prefix(
        redis_url: &str,
        key_prefix: impl Into<String>,
    ) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| map_redis_error("failed to create Redis client", e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;
        Ok(Self::with_prefix(conn, key_prefix))
    }

    fn storage_key(&self, key: &ShortKey) -> String {
        key.storage_key(&self.key_prefix)
    }
}

#[async_trait]
impl DurableStore for RedisStore {
    async fn load(&self, key: &ShortKey) -> Result<Option<UrlRecord>> {
        let storage_key = self.storage_key(key);
        trace!(key = %key, "loading record from Redis");

        let mut conn = self.conn.clone();
        match conn.get::<_, Option<Vec<u8>>>(&storage_key).await {
            Ok(Some(blob)) => {
                debug!(key = %key, "record found in Redis");
                codec::decode(key, &blob).map(Some)
            }
            Ok(None) => {
                trace!(key = %key, "no record in Redis");
                Ok(None)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Redis error on load");
                Err(map_redis_error("failed to fetch state from Redis", e))
            }
        }
    }

    async fn save(&self, key: &ShortKey, record: &UrlRecord) -> Result<()> {
        let storage_key = self.storage_key(key);
        trace!(key = %key, "saving record to Redis");

        let blob = codec::encode(record)?;

        let mut conn = self.conn.clone();
        match conn.set::<_, _, ()>(&storage_key, blob).await {
            Ok(()) => {
                debug!(key = %key, "record saved to Redis");
                Ok(())
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Redis error on save");
                Err(map_redis_error("failed to write state to Redis", e))
            }
        }
    }
}
