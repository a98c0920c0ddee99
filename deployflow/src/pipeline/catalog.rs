//! The validated, ordered set of declared stages.

use super::{CatalogBuilder, ParameterSet, StageDefinition, TemplateRef};
use crate::config::DeployConfig;
use crate::core::{ResourceKind, ResourceReference, StageId};
use crate::errors::DeployflowError;
use std::collections::{BTreeSet, VecDeque};

/// Id of the guardrails stage in the standard catalog.
pub const GUARDRAILS_STAGE: &str = "guardrails";
/// Id of the connections stage in the standard catalog.
pub const CONNECTIONS_STAGE: &str = "connections";
/// Id of the agents stage in the standard catalog.
pub const AGENTS_STAGE: &str = "agents";

/// A validated stage catalog.
///
/// Construction goes through [`CatalogBuilder`], so every catalog is acyclic,
/// references only declared stages, and is declared dependency-first. The
/// position of a stage is its ordinal in the fixed total order.
#[derive(Debug, Clone, PartialEq)]
pub struct StageCatalog {
    stages: Vec<StageDefinition>,
}

impl StageCatalog {
    pub(crate) fn from_validated(stages: Vec<StageDefinition>) -> Self {
        Self { stages }
    }

    /// Returns a new catalog builder.
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Builds the standard guardrails, connections, agents catalog.
    ///
    /// Template and parameter paths are resolved under
    /// [`DeployConfig::infrastructure_root`]. The guardrails stage always
    /// provides [`DeployConfig::guardrail_policy`].
    ///
    /// # Errors
    ///
    /// Never fails for the built-in table; the result is still checked.
    pub fn standard(config: &DeployConfig) -> Result<Self, DeployflowError> {
        let root = &config.infrastructure_root;

        CatalogBuilder::new()
            .stage(
                StageDefinition::new(GUARDRAILS_STAGE)
                    .with_output(ResourceReference::guardrail(config.guardrail_policy.clone()))
                    .with_template(TemplateRef::Bicep(
                        root.join("modules").join("guardrails").join("content_filter.bicep"),
                    ))
                    .with_parameters(ParameterSet::from_file(
                        root.join("parameters").join("guardrails.bicepparam"),
                    )),
            )?
            .stage(
                StageDefinition::new(CONNECTIONS_STAGE)
                    .with_dependency(GUARDRAILS_STAGE)
                    .produces(ResourceKind::Connection)
                    .with_template(TemplateRef::Bicep(
                        root.join("modules").join("connections").join("connection.bicep"),
                    ))
                    .with_parameters(ParameterSet::from_file(
                        root.join("parameters").join("connections.bicepparam"),
                    )),
            )?
            .stage(
                StageDefinition::new(AGENTS_STAGE)
                    .with_dependency(CONNECTIONS_STAGE)
                    .produces(ResourceKind::Agent)
                    .with_template(TemplateRef::AgentDefinition)
                    .accepts_descriptors(),
            )?
            .build()
    }

    /// Returns all stages in declared order.
    #[must_use]
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the catalog has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Looks up a stage by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.id.as_str() == id)
    }

    /// Returns the ordinal of a stage.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id.as_str() == id)
    }

    /// Returns true if the stage is declared.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Returns every stage id in declared order.
    #[must_use]
    pub fn ids(&self) -> Vec<StageId> {
        self.stages.iter().map(|s| s.id.clone()).collect()
    }

    /// Returns the stages that depend on `id` directly, in declared order.
    #[must_use]
    pub fn dependents_of(&self, id: &StageId) -> Vec<&StageId> {
        self.stages
            .iter()
            .filter(|s| s.dependencies.contains(id))
            .map(|s| &s.id)
            .collect()
    }

    /// Returns every direct or transitive dependent of `id`, in declared order.
    #[must_use]
    pub fn transitive_dependents(&self, id: &StageId) -> Vec<StageId> {
        let mut seen: BTreeSet<StageId> = BTreeSet::new();
        let mut queue: VecDeque<&StageId> = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents_of(current) {
                if seen.insert(dependent.clone()) {
                    queue.push_back(dependent);
                }
            }
        }

        self.stages
            .iter()
            .filter(|s| seen.contains(&s.id))
            .map(|s| s.id.clone())
            .collect()
    }

    /// Returns every direct or transitive dependency of `id`, in declared order.
    #[must_use]
    pub fn transitive_dependencies(&self, id: &StageId) -> Vec<StageId> {
        let mut seen: BTreeSet<StageId> = BTreeSet::new();
        let mut stack: Vec<&StageId> = vec![id];

        while let Some(current) = stack.pop() {
            if let Some(stage) = self.get(current.as_str()) {
                for dep in &stage.dependencies {
                    if seen.insert(dep.clone()) {
                        stack.push(dep);
                    }
                }
            }
        }

        self.stages
            .iter()
            .filter(|s| seen.contains(&s.id))
            .map(|s| s.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn diamond() -> StageCatalog {
        StageCatalog::builder()
            .stage(StageDefinition::new("base"))
            .unwrap()
            .stage(StageDefinition::new("left").with_dependency("base"))
            .unwrap()
            .stage(StageDefinition::new("right").with_dependency("base"))
            .unwrap()
            .stage(StageDefinition::new("top").with_dependencies(["left", "right"]))
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_standard_catalog_order() {
        let catalog = StageCatalog::standard(&DeployConfig::default()).unwrap();
        let ids: Vec<String> = catalog.ids().iter().map(ToString::to_string).collect();

        assert_eq!(ids, vec!["guardrails", "connections", "agents"]);
        assert!(catalog.get(AGENTS_STAGE).unwrap().accepts_descriptors);
    }

    #[test]
    fn test_standard_catalog_paths() {
        let catalog = StageCatalog::standard(&DeployConfig::default()).unwrap();
        let connections = catalog.get(CONNECTIONS_STAGE).unwrap();

        assert_eq!(
            connections.template.path(),
            Some(&PathBuf::from("infrastructure/modules/connections/connection.bicep"))
        );
        assert_eq!(
            connections.parameters.file,
            Some(PathBuf::from("infrastructure/parameters/connections.bicepparam"))
        );
    }

    #[test]
    fn test_standard_guardrails_output() {
        let config = DeployConfig::default().with_guardrail_policy("strict-filter");
        let catalog = StageCatalog::standard(&config).unwrap();
        let guardrails = catalog.get(GUARDRAILS_STAGE).unwrap();

        assert!(guardrails.outputs.contains(&ResourceReference::guardrail("strict-filter")));
        assert!(guardrails.produces.contains(&ResourceKind::Guardrail));
        assert!(catalog.get(CONNECTIONS_STAGE).unwrap().outputs.is_empty());
    }

    #[test]
    fn test_transitive_dependents() {
        let catalog = diamond();
        let deps = catalog.transitive_dependents(&StageId::from("base"));
        let names: Vec<&str> = deps.iter().map(StageId::as_str).collect();

        assert_eq!(names, vec!["left", "right", "top"]);
        assert!(catalog.transitive_dependents(&StageId::from("top")).is_empty());
    }

    #[test]
    fn test_transitive_dependencies() {
        let catalog = diamond();
        let deps = catalog.transitive_dependencies(&StageId::from("top"));
        let names: Vec<&str> = deps.iter().map(StageId::as_str).collect();

        assert_eq!(names, vec!["base", "left", "right"]);
    }

    #[test]
    fn test_position_and_contains() {
        let catalog = diamond();
        assert_eq!(catalog.position("right"), Some(2));
        assert!(catalog.contains("top"));
        assert!(!catalog.contains("network"));
    }
}
