//! Stage specifications.

use crate::core::{ResourceKind, ResourceReference, StageId};
use crate::errors::{CatalogValidationError, ContractErrorInfo};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// The template a stage deploys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "path", rename_all = "snake_case")]
pub enum TemplateRef {
    /// A Bicep template file.
    Bicep(PathBuf),
    /// Agents are created from their descriptors through the provider SDK.
    AgentDefinition,
}

impl TemplateRef {
    /// Returns the template file, if the template is file based.
    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Bicep(path) => Some(path),
            Self::AgentDefinition => None,
        }
    }
}

/// Parameters applied together with a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Parameter file, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Inline parameter overrides.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, serde_json::Value>,
}

impl ParameterSet {
    /// Creates a parameter set backed by a file.
    #[must_use]
    pub fn from_file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            overrides: BTreeMap::new(),
        }
    }

    /// Adds an inline override.
    #[must_use]
    pub fn with_override(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.overrides.insert(key.into(), value);
        self
    }
}

/// Specification for a single deployment stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageDefinition {
    /// The unique id of the stage.
    pub id: StageId,
    /// Ids of stages this stage depends on.
    pub dependencies: BTreeSet<StageId>,
    /// Resource kinds this stage creates.
    pub produces: BTreeSet<ResourceKind>,
    /// Resources this stage always creates, independent of any consumer.
    pub outputs: BTreeSet<ResourceReference>,
    /// The template to apply.
    pub template: TemplateRef,
    /// The parameters to apply the template with.
    pub parameters: ParameterSet,
    /// Whether requests may attach consumer descriptors to this stage.
    pub accepts_descriptors: bool,
}

impl StageDefinition {
    /// Creates a new stage definition with an agent-definition template.
    #[must_use]
    pub fn new(id: impl Into<StageId>) -> Self {
        Self {
            id: id.into(),
            dependencies: BTreeSet::new(),
            produces: BTreeSet::new(),
            outputs: BTreeSet::new(),
            template: TemplateRef::AgentDefinition,
            parameters: ParameterSet::default(),
            accepts_descriptors: false,
        }
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<StageId>>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<StageId>) -> Self {
        self.dependencies.insert(dep.into());
        self
    }

    /// Declares a resource kind this stage produces.
    #[must_use]
    pub fn produces(mut self, kind: ResourceKind) -> Self {
        self.produces.insert(kind);
        self
    }

    /// Declares a resource this stage always produces.
    ///
    /// The resource kind is added to [`StageDefinition::produces`] as well.
    #[must_use]
    pub fn with_output(mut self, resource: ResourceReference) -> Self {
        self.produces.insert(resource.kind);
        self.outputs.insert(resource);
        self
    }

    /// Sets the template.
    #[must_use]
    pub fn with_template(mut self, template: TemplateRef) -> Self {
        self.template = template;
        self
    }

    /// Sets the parameter set.
    #[must_use]
    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = parameters;
        self
    }

    /// Marks the stage as consuming descriptors.
    #[must_use]
    pub fn accepts_descriptors(mut self) -> Self {
        self.accepts_descriptors = true;
        self
    }

    /// Validates the stage specification in isolation.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage depends on itself.
    pub fn validate(&self) -> Result<(), CatalogValidationError> {
        if self.dependencies.contains(&self.id) {
            return Err(CatalogValidationError::new(format!(
                "Stage '{}' cannot depend on itself",
                self.id
            ))
            .with_stages(vec![self.id.to_string()])
            .with_error_info(
                ContractErrorInfo::new("DEPLOY-003-SELF_DEP", "Stage depends on itself")
                    .with_fix_hint("Remove the stage from its own dependency list."),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_definition_creation() {
        let def = StageDefinition::new("connections")
            .with_dependencies(["guardrails"])
            .produces(ResourceKind::Connection)
            .with_template(TemplateRef::Bicep(PathBuf::from("connection.bicep")))
            .with_parameters(ParameterSet::from_file("connections.bicepparam"));

        assert_eq!(def.id.as_str(), "connections");
        assert_eq!(def.dependencies.len(), 1);
        assert!(def.produces.contains(&ResourceKind::Connection));
        assert_eq!(def.template.path(), Some(&PathBuf::from("connection.bicep")));
        assert!(!def.accepts_descriptors);
    }

    #[test]
    fn test_with_output_implies_kind() {
        let def = StageDefinition::new("guardrails")
            .with_output(ResourceReference::guardrail("default-content-filter"));

        assert!(def.produces.contains(&ResourceKind::Guardrail));
        assert_eq!(def.outputs.len(), 1);
    }

    #[test]
    fn test_stage_self_dependency() {
        let def = StageDefinition::new("agents").with_dependency("agents");
        let err = def.validate().unwrap_err();

        assert_eq!(err.error_info.unwrap().code, "DEPLOY-003-SELF_DEP");
    }

    #[test]
    fn test_template_ref_serialize() {
        let json = serde_json::to_value(TemplateRef::AgentDefinition).unwrap();
        assert_eq!(json, serde_json::json!({"type": "agent_definition"}));
    }
}
