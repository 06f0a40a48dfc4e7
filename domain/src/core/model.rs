//! Model identifier value object

use serde::{Deserialize, Serialize};

/// Identifier of a backend model taking part in consensus rounds.
///
/// The runtime never interprets the identifier; it is only used as a key for
/// per-model histories, usage counters and gateway calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ModelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ModelId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&ModelId::new("gpt-5")).unwrap();
        assert_eq!(json, "\"gpt-5\"");
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let mut ids = vec![ModelId::new("b"), ModelId::new("a")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "a");
    }
}
