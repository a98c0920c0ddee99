//! Stage catalog builder with validation.

use super::{StageCatalog, StageDefinition};
use crate::core::StageId;
use crate::errors::{CatalogValidationError, ContractErrorInfo, CycleDetectedError, DeployflowError};
use regex::Regex;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::LazyLock;

#[allow(clippy::unwrap_used)]
static STAGE_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]*$").unwrap());

/// Builder for creating validated stage catalogs.
///
/// Stages keep their insertion order; that order is the fixed total order the
/// orchestrator executes in, so it must list every dependency before its
/// dependents. Forward references are allowed while building and resolved in
/// [`CatalogBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    stages: Vec<StageDefinition>,
}

impl CatalogBuilder {
    /// Creates a new catalog builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stage to the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage id is malformed, duplicated, or the stage
    /// depends on itself.
    pub fn stage(mut self, definition: StageDefinition) -> Result<Self, DeployflowError> {
        self.add_stage(definition)?;
        Ok(self)
    }

    /// Adds a stage definition.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn add_stage(&mut self, definition: StageDefinition) -> Result<(), DeployflowError> {
        if !STAGE_ID_PATTERN.is_match(definition.id.as_str()) {
            return Err(CatalogValidationError::new(format!(
                "Invalid stage id '{}': use lowercase letters, digits, '-' or '_'",
                definition.id
            ))
            .with_stages(vec![definition.id.to_string()])
            .into());
        }

        definition.validate()?;

        if self.stages.iter().any(|s| s.id == definition.id) {
            return Err(CatalogValidationError::new(format!(
                "Stage '{}' is declared twice",
                definition.id
            ))
            .with_stages(vec![definition.id.to_string()])
            .with_error_info(
                ContractErrorInfo::new("DEPLOY-003-DUPLICATE", "Duplicate stage id")
                    .with_fix_hint("Give every stage a unique id."),
            )
            .into());
        }

        self.stages.push(definition);
        Ok(())
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Builds the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`DeployflowError::CyclicDependency`] if the dependency graph has
    /// a cycle, and [`DeployflowError::InvalidCatalog`] if the catalog is empty,
    /// references an undeclared stage, or lists a dependent before its
    /// dependency.
    pub fn build(self) -> Result<StageCatalog, DeployflowError> {
        if self.stages.is_empty() {
            return Err(CatalogValidationError::new("Stage catalog has no stages")
                .with_error_info(
                    ContractErrorInfo::new("DEPLOY-003-EMPTY", "Cannot build an empty catalog")
                        .with_fix_hint("Declare at least one stage before building."),
                )
                .into());
        }

        let declared: BTreeSet<&StageId> = self.stages.iter().map(|s| &s.id).collect();
        for stage in &self.stages {
            if let Some(dep) = stage.dependencies.iter().find(|d| !declared.contains(d)) {
                return Err(CatalogValidationError::new(format!(
                    "Stage '{}' depends on unknown stage '{}'",
                    stage.id, dep
                ))
                .with_stages(vec![stage.id.to_string(), dep.to_string()])
                .with_error_info(
                    ContractErrorInfo::new(
                        "DEPLOY-003-MISSING_DEP",
                        format!("Dependency '{dep}' not found"),
                    )
                    .with_fix_hint("Declare the dependency as a stage or remove it."),
                )
                .into());
            }
        }

        topological_order(&self.stages)?;
        check_declared_order(&self.stages)?;

        Ok(StageCatalog::from_validated(self.stages))
    }
}

/// Sorts the stages with Kahn's algorithm.
///
/// Any stage the sort cannot reach is part of (or stuck behind) a cycle.
pub(crate) fn topological_order(stages: &[StageDefinition]) -> Result<Vec<StageId>, CycleDetectedError> {
    let mut in_degree: HashMap<&StageId, usize> =
        stages.iter().map(|s| (&s.id, s.dependencies.len())).collect();

    // Seed in declaration order for determinism.
    let mut queue: VecDeque<&StageId> = stages
        .iter()
        .filter(|s| s.dependencies.is_empty())
        .map(|s| &s.id)
        .collect();

    let mut order = Vec::with_capacity(stages.len());
    while let Some(current) = queue.pop_front() {
        order.push(current.clone());
        for dependent in stages.iter().filter(|s| s.dependencies.contains(current)) {
            if let Some(count) = in_degree.get_mut(&dependent.id) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    queue.push_back(&dependent.id);
                }
            }
        }
    }

    if order.len() != stages.len() {
        let sorted: BTreeSet<&StageId> = order.iter().collect();
        let participants = stages
            .iter()
            .filter(|s| !sorted.contains(&s.id))
            .map(|s| s.id.to_string())
            .collect();
        return Err(CycleDetectedError::new(participants));
    }

    Ok(order)
}

fn check_declared_order(stages: &[StageDefinition]) -> Result<(), CatalogValidationError> {
    let position: HashMap<&StageId, usize> =
        stages.iter().enumerate().map(|(i, s)| (&s.id, i)).collect();

    for (index, stage) in stages.iter().enumerate() {
        for dep in &stage.dependencies {
            if position.get(dep).is_some_and(|&p| p > index) {
                return Err(CatalogValidationError::new(format!(
                    "Stage '{}' is declared before its dependency '{}'",
                    stage.id, dep
                ))
                .with_stages(vec![stage.id.to_string(), dep.to_string()])
                .with_error_info(
                    ContractErrorInfo::new("DEPLOY-003-ORDER", "Declared order is not dependency-first")
                        .with_fix_hint("Declare every stage after the stages it depends on."),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(id: &str, deps: &[&str]) -> StageDefinition {
        StageDefinition::new(id).with_dependencies(deps.iter().copied())
    }

    #[test]
    fn test_builder_creation() {
        let builder = CatalogBuilder::new();
        assert_eq!(builder.stage_count(), 0);
    }

    #[test]
    fn test_builder_linear_chain() {
        let catalog = CatalogBuilder::new()
            .stage(stage("guardrails", &[]))
            .unwrap()
            .stage(stage("connections", &["guardrails"]))
            .unwrap()
            .stage(stage("agents", &["connections"]))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_builder_missing_dependency() {
        let err = CatalogBuilder::new()
            .stage(stage("agents", &["connections"]))
            .unwrap()
            .build()
            .unwrap_err();

        match err {
            DeployflowError::InvalidCatalog(inner) => {
                assert_eq!(inner.error_info.unwrap().code, "DEPLOY-003-MISSING_DEP");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builder_cycle_detection() {
        let err = CatalogBuilder::new()
            .stage(stage("a", &["c"]))
            .unwrap()
            .stage(stage("b", &["a"]))
            .unwrap()
            .stage(stage("c", &["b"]))
            .unwrap()
            .stage(stage("d", &[]))
            .unwrap()
            .build()
            .unwrap_err();

        match err {
            DeployflowError::CyclicDependency(cycle) => {
                assert_eq!(cycle.participants, vec!["a", "b", "c"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builder_rejects_dependent_declared_first() {
        let err = CatalogBuilder::new()
            .stage(stage("agents", &["connections"]))
            .unwrap()
            .stage(stage("connections", &[]))
            .unwrap()
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("declared before its dependency"));
    }

    #[test]
    fn test_builder_duplicate_and_malformed_ids() {
        let dup = CatalogBuilder::new()
            .stage(stage("agents", &[]))
            .unwrap()
            .stage(stage("agents", &[]));
        assert!(dup.is_err());

        let malformed = CatalogBuilder::new().stage(stage("Agents Stage", &[]));
        assert!(malformed.is_err());
    }

    #[test]
    fn test_builder_self_dependency() {
        let result = CatalogBuilder::new().stage(stage("agents", &["agents"]));
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_empty_build() {
        let err = CatalogBuilder::new().build().unwrap_err();
        assert!(err.is_configuration_time());
    }

    #[test]
    fn test_topological_order_diamond() {
        let stages = vec![
            stage("base", &[]),
            stage("left", &["base"]),
            stage("right", &["base"]),
            stage("top", &["left", "right"]),
        ];

        let order = topological_order(&stages).unwrap();
        let names: Vec<&str> = order.iter().map(StageId::as_str).collect();
        assert_eq!(names, vec!["base", "left", "right", "top"]);
    }

    #[test]
    fn test_topological_order_is_breadth_first() {
        let stages = vec![
            stage("network", &[]),
            stage("identity", &[]),
            stage("gateway", &["network"]),
            stage("portal", &["gateway", "identity"]),
        ];

        let order = topological_order(&stages).unwrap();
        let names: Vec<&str> = order.iter().map(StageId::as_str).collect();
        assert_eq!(names, vec!["network", "identity", "gateway", "portal"]);
    }
}
