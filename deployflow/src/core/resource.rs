//! Resource references and deployment handles.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The kind of a deployable artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A content filter / RAI policy.
    Guardrail,
    /// An API connection consumed by agent tools.
    Connection,
    /// A deployed agent.
    Agent,
    /// A vector store backing a file search tool.
    VectorStore,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guardrail => write!(f, "guardrail"),
            Self::Connection => write!(f, "connection"),
            Self::Agent => write!(f, "agent"),
            Self::VectorStore => write!(f, "vector_store"),
        }
    }
}

/// A `(kind, name)` pair identifying a specific deployable artifact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceReference {
    /// The resource kind.
    pub kind: ResourceKind,
    /// The resource name.
    pub name: String,
}

impl ResourceReference {
    /// Creates a new resource reference.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Creates a connection reference.
    #[must_use]
    pub fn connection(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Connection, name)
    }

    /// Creates a guardrail reference.
    #[must_use]
    pub fn guardrail(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Guardrail, name)
    }
}

impl fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.name)
    }
}

/// What a deployer hands back after a successful deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceHandle {
    /// Provider-side identifier (deployment id, agent id, ...).
    pub id: String,
    /// Human readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Provider specific outputs.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub outputs: HashMap<String, serde_json::Value>,
}

impl ResourceHandle {
    /// Creates a handle with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds an output value.
    #[must_use]
    pub fn with_output(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.outputs.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_reference_display() {
        let r = ResourceReference::connection("weathertool");
        assert_eq!(r.to_string(), "connection 'weathertool'");
    }

    #[test]
    fn test_resource_reference_ordering_groups_by_kind() {
        let mut refs = vec![
            ResourceReference::connection("b"),
            ResourceReference::guardrail("z"),
            ResourceReference::connection("a"),
        ];
        refs.sort();
        assert_eq!(refs[0], ResourceReference::guardrail("z"));
        assert_eq!(refs[1], ResourceReference::connection("a"));
    }

    #[test]
    fn test_resource_kind_serialize() {
        let json = serde_json::to_string(&ResourceKind::VectorStore).unwrap();
        assert_eq!(json, r#""vector_store""#);
    }
}
