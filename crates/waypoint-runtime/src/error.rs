use thiserror::Error;
use waypoint_core::StoreError;

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors surfaced by [`UrlRuntime`](crate::UrlRuntime) operations.
///
/// A key that was never set is not an error: `get_url` returns `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
    #[error("runtime is shutting down")]
    ShuttingDown,
    #[error("write for key '{0}' was interrupted")]
    Interrupted(String),
}

impl RuntimeError {
    /// Whether the hosting transport should report a retryable failure.
    pub fn is_transient(&self) -> bool {
        match self {
            RuntimeError::Persistence(source) => source.is_transient(),
            RuntimeError::ShuttingDown | RuntimeError::Interrupted(_) => true,
        }
    }
}
