//! Caller identity value object

use serde::{Deserialize, Serialize};

/// Cooperative label identifying the logical caller of a tool (e.g. `"personal"`).
///
/// Not a credential: the server trusts whatever label arrives in
/// `arguments.caller` and authorizes it against its allowlist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    /// Build a caller id, rejecting empty or whitespace-only labels.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CallerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CallerId::new(s).ok_or_else(|| "caller identity cannot be empty".to_string())
    }
}
