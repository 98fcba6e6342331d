use thiserror::Error;

/// Result type for durable store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors reported by a [`DurableStore`](crate::DurableStore).
///
/// Adapters report failures as they happen; they never retry on their own.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("state serialization failed: {0}")]
    Serialization(String),
    #[error("stored state is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StoreError {
    /// Whether a caller may reasonably retry the operation later.
    ///
    /// Corrupt or unencodable state will fail the same way again.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Serialization(_) | Self::InvalidData(_))
    }
}
