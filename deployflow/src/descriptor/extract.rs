//! Extracting named resource dependencies from descriptors.

use super::{Descriptor, ToolEntry};
use crate::core::{ResourceKind, ResourceReference};
use crate::errors::DeployflowError;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};

/// Connection used by search tools that do not name one.
pub const DEFAULT_SEARCH_CONNECTION: &str = "CONN_PRIMARY_SEARCH";
/// Index used by search tools that do not name one.
pub const DEFAULT_SEARCH_INDEX: &str = "primary-search-index";

/// Tool types a descriptor may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Azure AI Search over an index behind a connection.
    AzureAiSearch,
    /// File search over a vector store.
    FileSearch,
    /// OpenAPI described HTTP tool.
    OpenApi,
    /// Model Context Protocol server.
    Mcp,
    /// Sandboxed code interpreter.
    CodeInterpreter,
    /// A plain connection reference.
    Connection,
    /// A Bing grounding connection.
    BingConnection,
}

impl ToolKind {
    /// Parses a tool type string.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "azure_ai_search" => Some(Self::AzureAiSearch),
            "file_search" => Some(Self::FileSearch),
            "openapi" => Some(Self::OpenApi),
            "mcp" => Some(Self::Mcp),
            "code_interpreter" => Some(Self::CodeInterpreter),
            "connection" => Some(Self::Connection),
            "bing_connection" => Some(Self::BingConnection),
            _ => None,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AzureAiSearch => write!(f, "azure_ai_search"),
            Self::FileSearch => write!(f, "file_search"),
            Self::OpenApi => write!(f, "openapi"),
            Self::Mcp => write!(f, "mcp"),
            Self::CodeInterpreter => write!(f, "code_interpreter"),
            Self::Connection => write!(f, "connection"),
            Self::BingConnection => write!(f, "bing_connection"),
        }
    }
}

/// Turns a parsed descriptor into the set of resources it relies on.
///
/// Extraction is pure; the only side effect is a warning for tool entries
/// that are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyExtractor;

impl DependencyExtractor {
    /// Creates a new extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Extracts every named dependency of a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`DeployflowError::MalformedDescriptor`] if a dependency lacks
    /// its identifying name or a tool is missing a required option.
    pub fn extract(&self, descriptor: &Descriptor) -> Result<BTreeSet<ResourceReference>, DeployflowError> {
        let mut refs = BTreeSet::new();

        if let Some(guardrail) = &descriptor.guardrail {
            let name = required_name(descriptor, guardrail, "guardrail name is blank")?;
            refs.insert(ResourceReference::guardrail(name));
        }

        for (index, tool) in descriptor.tools.iter().enumerate() {
            let Some(raw_type) = tool.effective_type() else {
                warn!(
                    descriptor = %descriptor.name,
                    index,
                    "Tool entry has no type, skipping"
                );
                continue;
            };

            let Some(kind) = ToolKind::parse(raw_type) else {
                warn!(
                    descriptor = %descriptor.name,
                    tool_type = raw_type,
                    "Unsupported tool type, skipping"
                );
                continue;
            };

            extract_tool(descriptor, tool, kind, &mut refs)?;
        }

        Ok(refs)
    }
}

fn extract_tool(
    descriptor: &Descriptor,
    tool: &ToolEntry,
    kind: ToolKind,
    refs: &mut BTreeSet<ResourceReference>,
) -> Result<(), DeployflowError> {
    let label = tool.effective_id().unwrap_or("<unnamed>");

    match kind {
        ToolKind::Connection | ToolKind::BingConnection => {
            let id = tool.effective_id().ok_or_else(|| {
                malformed(descriptor, format!("{kind} tool has no id naming its connection"))
            })?;
            let name = required_name(descriptor, id, &format!("{kind} tool has a blank id"))?;
            refs.insert(ResourceReference::connection(name));
        }
        ToolKind::OpenApi => {
            let has_spec = tool.option_str("specification").or_else(|| tool.option_str("spec_url"));
            if has_spec.is_none() {
                return Err(malformed(
                    descriptor,
                    format!("openapi tool '{label}' is missing 'specification'"),
                ));
            }
            if let Some(connection) = tool.option_str("connection_id") {
                let name = required_name(
                    descriptor,
                    &connection,
                    &format!("openapi tool '{label}' has a blank connection_id"),
                )?;
                refs.insert(ResourceReference::connection(name));
            }
        }
        ToolKind::AzureAiSearch => {
            let connection = tool
                .option_str("connection_id")
                .unwrap_or_else(|| DEFAULT_SEARCH_CONNECTION.to_string());
            let name = required_name(
                descriptor,
                &connection,
                &format!("azure_ai_search tool '{label}' has a blank connection_id"),
            )?;
            let index = tool
                .option_str("index_name")
                .unwrap_or_else(|| DEFAULT_SEARCH_INDEX.to_string());
            debug!(tool = label, connection = name, index = %index, "Search tool dependency");
            refs.insert(ResourceReference::connection(name));
        }
        ToolKind::FileSearch => match tool.option_str("vector_store_id") {
            Some(store) => {
                let name = required_name(
                    descriptor,
                    &store,
                    &format!("file_search tool '{label}' has a blank vector_store_id"),
                )?;
                refs.insert(ResourceReference::new(ResourceKind::VectorStore, name));
            }
            None => warn!(
                descriptor = %descriptor.name,
                tool = label,
                "file_search tool has no vector_store_id"
            ),
        },
        ToolKind::Mcp => {
            if tool.option_str("server_url").is_none() {
                return Err(malformed(
                    descriptor,
                    format!("mcp tool '{label}' is missing 'server_url'"),
                ));
            }
        }
        ToolKind::CodeInterpreter => {}
    }

    Ok(())
}

fn required_name<'a>(descriptor: &Descriptor, name: &'a str, reason: &str) -> Result<&'a str, DeployflowError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(malformed(descriptor, reason))
    } else {
        Ok(trimmed)
    }
}

fn malformed(descriptor: &Descriptor, reason: impl Into<String>) -> DeployflowError {
    let label = if descriptor.name.trim().is_empty() {
        descriptor
            .source
            .as_ref()
            .map_or_else(|| "<unnamed>".to_string(), |p| p.display().to_string())
    } else {
        descriptor.name.clone()
    };

    DeployflowError::MalformedDescriptor {
        descriptor: label,
        reason: reason.into(),
    }
}
