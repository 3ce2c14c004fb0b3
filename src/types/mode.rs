//! Per-request routing mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::MimirError;

/// How a selection policy answers a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Serve from the cache only.
    Cached,
    /// Always call the source, then cache the result.
    Download,
    /// Download when the cache cannot answer or the coin says so, otherwise
    /// serve from the cache.
    #[default]
    Mixed,
}

impl SelectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Cached => "cached",
            SelectionMode::Download => "download",
            SelectionMode::Mixed => "mixed",
        }
    }
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionMode {
    type Err = MimirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cached" | "cache" => Ok(SelectionMode::Cached),
            "download" => Ok(SelectionMode::Download),
            "mixed" => Ok(SelectionMode::Mixed),
            other => Err(MimirError::InvalidArgument(format!(
                "unknown selection mode '{other}'"
            ))),
        }
    }
}
