use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Borrow;
use std::fmt::Display;

/// The caller-supplied address of one short link.
///
/// A `ShortKey` is opaque to the runtime: it is never validated or
/// normalized here, and two keys are the same owner exactly when their
/// strings are equal. Uniqueness and syntax policy belong to whoever mints
/// the key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortKey(SmolStr);

impl ShortKey {
    /// Wraps a caller-supplied key.
    ///
    /// # Examples
    ///
    /// ```
    /// use waypoint_core::ShortKey;
    ///
    /// let key = ShortKey::new("abc123");
    /// assert_eq!(key.as_str(), "abc123");
    /// ```
    pub fn new(key: impl Into<SmolStr>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the storage address for this key under the given prefix.
    pub fn storage_key(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0)
    }
}

impl std::fmt::Debug for ShortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ShortKey").field(&self.0).finish()
    }
}

impl Display for ShortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ShortKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ShortKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ShortKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Serialize for ShortKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShortKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = SmolStr::deserialize(deserializer)?;
        Ok(Self(s))
    }
}
