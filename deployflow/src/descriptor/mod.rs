//! Agent descriptors and dependency extraction.
//!
//! A descriptor is the YAML definition of an agent. Its tool entries name the
//! connections, vector stores and guardrails the agent needs at runtime, which
//! is what [`DependencyExtractor`] pulls out.

mod extract;
mod loader;
mod model;

pub use extract::{DEFAULT_SEARCH_CONNECTION, DEFAULT_SEARCH_INDEX, DependencyExtractor, ToolKind};
pub use loader::{YamlDescriptorLoader, parse_descriptor};
pub use model::{DEFAULT_INSTRUCTIONS, Descriptor, ModelSpec, ToolEntry};
