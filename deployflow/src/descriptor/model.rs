//! Agent descriptor model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Instructions used when a descriptor does not provide any.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant that answers general questions";

/// The model an agent runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model deployment id.
    pub id: String,
}

/// A single tool entry of an agent descriptor.
///
/// Older descriptors use `kind` instead of `type` and `name` instead of `id`;
/// both spellings are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolEntry {
    /// Tool type.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub tool_type: Option<String>,
    /// Legacy spelling of `type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Tool id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Legacy spelling of `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Type specific options.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl ToolEntry {
    /// Creates a tool entry of the given type.
    #[must_use]
    pub fn new(tool_type: impl Into<String>) -> Self {
        Self {
            tool_type: Some(tool_type.into()),
            ..Default::default()
        }
    }

    /// Sets the tool id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds an option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Returns the tool type, falling back to the legacy `kind`.
    #[must_use]
    pub fn effective_type(&self) -> Option<&str> {
        self.tool_type.as_deref().or(self.kind.as_deref())
    }

    /// Returns the tool id, falling back to the legacy `name`.
    #[must_use]
    pub fn effective_id(&self) -> Option<&str> {
        self.id.as_deref().or(self.name.as_deref())
    }

    /// Returns a string option.
    ///
    /// `None` when the option is absent or null; non-string values are
    /// rendered as JSON.
    #[must_use]
    pub fn option_str(&self, key: &str) -> Option<String> {
        match self.options.get(key)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// A parsed agent descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Agent name.
    pub name: String,
    /// Model the agent runs on.
    pub model: ModelSpec,
    /// System instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Tools the agent uses.
    #[serde(default)]
    pub tools: Vec<ToolEntry>,
    /// Guardrail policy the agent is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardrail: Option<String>,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// File the descriptor was loaded from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Descriptor {
    /// Creates a descriptor with no tools.
    #[must_use]
    pub fn new(name: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: ModelSpec { id: model_id.into() },
            instructions: None,
            tools: Vec::new(),
            guardrail: None,
            metadata: BTreeMap::new(),
            source: None,
        }
    }

    /// Adds a tool.
    #[must_use]
    pub fn with_tool(mut self, tool: ToolEntry) -> Self {
        self.tools.push(tool);
        self
    }

    /// Sets the guardrail.
    #[must_use]
    pub fn with_guardrail(mut self, guardrail: impl Into<String>) -> Self {
        self.guardrail = Some(guardrail.into());
        self
    }

    /// Returns the instructions, or the default ones.
    #[must_use]
    pub fn effective_instructions(&self) -> &str {
        self.instructions.as_deref().unwrap_or(DEFAULT_INSTRUCTIONS)
    }
}
