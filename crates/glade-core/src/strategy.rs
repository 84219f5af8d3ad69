//! Eviction strategies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a cache ranks its entries for eviction.
///
/// Configuration files and environment variables use the short names
/// `LRU` and `LFU`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Least recently used entries are evicted first.
    #[default]
    #[serde(rename = "LRU", alias = "lru", alias = "recency")]
    Recency,
    /// Least frequently used entries are evicted first.
    #[serde(rename = "LFU", alias = "lfu", alias = "frequency")]
    Frequency,
}

impl Strategy {
    /// Returns the short name used in configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recency => "LRU",
            Self::Frequency => "LFU",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LRU" | "RECENCY" => Ok(Self::Recency),
            "LFU" | "FREQUENCY" => Ok(Self::Frequency),
            other => Err(format!("unknown cache strategy '{other}'")),
        }
    }
}
