use thiserror::Error;

/// Failures while bringing up or talking to a disposable backend.
#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("failed to start container: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("redis fixture unusable: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("mysql fixture unusable after {attempts} connection attempts: {source}")]
    MySql {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to apply schema: {0}")]
    Schema(#[source] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, TestInfraError>;
