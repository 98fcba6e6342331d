use crate::short_key::ShortKey;
use serde::{Deserialize, Serialize};

/// The persisted state of one short link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Copy of the owning key, so a stored blob describes itself.
    pub short_key: ShortKey,
    /// The URL the short key redirects to.
    pub full_url: String,
}

impl UrlRecord {
    pub fn new(short_key: ShortKey, full_url: impl Into<String>) -> Self {
        Self {
            short_key,
            full_url: full_url.into(),
        }
    }
}
