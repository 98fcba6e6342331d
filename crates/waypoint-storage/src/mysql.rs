use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::{MySqlPool, Row};
use tracing::trace;
use waypoint_core::codec;
use waypoint_core::{DurableStore, Result, ShortKey, StoreError, UrlRecord};

/// MySQL implementation of [`DurableStore`].
///
/// One row per short key in `url_records`, holding the encoded blob. Saves
/// are a single upsert statement, so a row is replaced whole or not at all.
/// See `ddl/mysql/url_records.sql` for the schema. The key column uses a
/// binary collation: keys are compared byte for byte, never case- or
/// accent-folded.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_) => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

#[async_trait]
impl DurableStore for MySqlStore {
    async fn load(&self, key: &ShortKey) -> Result<Option<UrlRecord>> {
        trace!(key = %key, "loading record from MySQL");

        let row = sqlx::query(
            r#"
            SELECT state
            FROM url_records
            WHERE short_key = ?
            LIMIT 1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let blob: Vec<u8> = row.try_get("state").map_err(map_sqlx_error)?;
        codec::decode(key, &blob).map(Some)
    }

    async fn save(&self, key: &ShortKey, record: &UrlRecord) -> Result<()> {
        trace!(key = %key, "saving record to MySQL");

        let blob = codec::encode(record)?;

        sqlx::query(
            r#"
            INSERT INTO url_records (short_key, state, updated_at)
            VALUES (?, ?, ?) AS incoming
            ON DUPLICATE KEY UPDATE
                state = incoming.state,
                updated_at = incoming.updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(blob)
        .bind(Timestamp::now().as_second())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
