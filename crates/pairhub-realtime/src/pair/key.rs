//! Case-insensitive pair keys.

use std::fmt;

use serde::Serialize;

/// A pair name normalized to lowercase.
///
/// Every hub entry point builds one of these before touching its maps, so
/// `"BTCUSD"`, `"BtcUsd"` and `"btcusd"` share a subscriber set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PairKey(String);

impl PairKey {
    /// Normalize a raw pair name.
    pub fn new(raw: &str) -> Self {
        Self(raw.to_lowercase())
    }

    /// The normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PairKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl AsRef<str> for PairKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
