use crate::short_key::ShortKey;
use async_trait::async_trait;

/// The inbound operation surface a hosting transport marshals requests into.
///
/// Keys and URLs are passed through as given; validating URL syntax and
/// minting unique keys happen before a request reaches this trait.
#[async_trait]
pub trait UrlService: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Points `key` at `full_url`, returning once the change is durable.
    async fn set_url(&self, key: &ShortKey, full_url: &str) -> Result<(), Self::Error>;

    /// Returns the URL `key` points at, or `None` if it was never set.
    async fn get_url(&self, key: &ShortKey) -> Result<Option<String>, Self::Error>;
}
