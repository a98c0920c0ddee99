//! Stage identifiers.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// The identifier of a declared stage, e.g. `guardrails`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(String);

impl StageId {
    /// Creates a stage id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for StageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for StageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_stage_id_lookup_by_str() {
        let ids: BTreeSet<StageId> = ["agents", "guardrails"].into_iter().map(StageId::from).collect();
        assert!(ids.contains("agents"));
        assert!(!ids.contains("connections"));
    }

    #[test]
    fn test_stage_id_serializes_as_string() {
        let json = serde_json::to_string(&StageId::from("connections")).unwrap();
        assert_eq!(json, r#""connections""#);
    }
}
