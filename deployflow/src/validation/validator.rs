//! Per-stage dependency validation.

use super::DescriptorDemand;
use crate::core::{ResourceReference, StageAction, StageId, StageState};
use crate::errors::DeployflowError;
use crate::inventory::InventoryChecker;
use crate::orchestrator::OutcomeTable;
use crate::pipeline::{DeploymentPlan, StageCatalog, StageDefinition};
use std::collections::BTreeSet;
use tracing::debug;

/// The verdict for one stage.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// The stage may proceed with its planned action.
    Ready,
    /// The stage must not proceed.
    Blocked(DeployflowError),
}

impl ValidationResult {
    /// Returns true if the stage may proceed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns the blocking reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&DeployflowError> {
        match self {
            Self::Ready => None,
            Self::Blocked(err) => Some(err),
        }
    }
}

/// Decides whether a stage may proceed given what is known so far.
///
/// For a `Run` stage every dependency must be `Succeeded` or `Skipped`. For a
/// `SkipAssumeExisting` stage the resources downstream requested stages rely
/// on are checked against the inventory, failing closed.
#[derive(Debug, Clone, Copy)]
pub struct StageValidator<'a> {
    catalog: &'a StageCatalog,
    demand: &'a DescriptorDemand,
}

impl<'a> StageValidator<'a> {
    /// Creates a validator over a catalog and the descriptor demand of the
    /// requested stages.
    #[must_use]
    pub fn new(catalog: &'a StageCatalog, demand: &'a DescriptorDemand) -> Self {
        Self { catalog, demand }
    }

    /// Validates a stage.
    pub async fn validate(
        &self,
        stage: &StageId,
        plan: &DeploymentPlan,
        outcomes: &OutcomeTable,
        inventory: &InventoryChecker,
    ) -> ValidationResult {
        let (Some(definition), Some(action)) = (self.catalog.get(stage.as_str()), plan.action_of(stage.as_str()))
        else {
            return ValidationResult::Blocked(DeployflowError::UnknownStage {
                stage: stage.clone(),
                declared: self.catalog.ids().iter().map(ToString::to_string).collect(),
            });
        };

        match action {
            StageAction::Run => self.validate_run(definition, plan, outcomes, inventory).await,
            StageAction::SkipAssumeExisting => {
                if let Some(reason) = self.upstream_block(definition, outcomes) {
                    return ValidationResult::Blocked(reason);
                }
                self.verify_skipped(definition, plan, inventory).await
            }
        }
    }

    async fn validate_run(
        &self,
        definition: &StageDefinition,
        plan: &DeploymentPlan,
        outcomes: &OutcomeTable,
        inventory: &InventoryChecker,
    ) -> ValidationResult {
        if let Some(reason) = self.upstream_block(definition, outcomes) {
            return ValidationResult::Blocked(reason);
        }

        for dep in self.ordered_dependencies(definition) {
            match outcomes.state(dep.as_str()) {
                Some(StageState::Pending) if plan.action_of(dep.as_str()) == Some(StageAction::SkipAssumeExisting) => {
                    let Some(dep_definition) = self.catalog.get(dep.as_str()) else {
                        continue;
                    };
                    debug!(stage = %definition.id, dependency = %dep, "Verifying unresolved skipped dependency");
                    if let Some(reason) = self.upstream_block(dep_definition, outcomes) {
                        return ValidationResult::Blocked(self.propagate(definition, dep, reason));
                    }
                    if let ValidationResult::Blocked(reason) =
                        self.verify_skipped(dep_definition, plan, inventory).await
                    {
                        return ValidationResult::Blocked(reason);
                    }
                }
                Some(state) if state.is_satisfied() => {}
                Some(state) => {
                    return ValidationResult::Blocked(DeployflowError::Internal(format!(
                        "stage '{}' validated while dependency '{dep}' is {state}",
                        definition.id
                    )));
                }
                None => {
                    return ValidationResult::Blocked(DeployflowError::Internal(format!(
                        "dependency '{dep}' of stage '{}' is not in the plan",
                        definition.id
                    )));
                }
            }
        }

        ValidationResult::Ready
    }

    /// Returns the reason a stage is blocked by a failed or blocked dependency.
    fn upstream_block(&self, definition: &StageDefinition, outcomes: &OutcomeTable) -> Option<DeployflowError> {
        for dep in self.ordered_dependencies(definition) {
            let Some(record) = outcomes.record(dep.as_str()) else {
                continue;
            };
            if !record.state.is_blocking() {
                continue;
            }

            let reason = match (record.state, &record.error) {
                (StageState::SkippedDependencyMissing, Some(err)) => self.propagate(definition, dep, err.clone()),
                (state, _) => DeployflowError::UpstreamFailed {
                    stage: definition.id.clone(),
                    upstream: dep.clone(),
                    state,
                },
            };
            return Some(reason);
        }
        None
    }

    /// Carries a dependency's blocking reason down to `definition`.
    ///
    /// Missing resources keep naming the resource; failures keep naming the
    /// stage that actually failed.
    fn propagate(&self, definition: &StageDefinition, dep: &StageId, reason: DeployflowError) -> DeployflowError {
        match reason {
            err @ (DeployflowError::MissingDependency { .. } | DeployflowError::InventoryUnavailable { .. }) => err,
            DeployflowError::UpstreamFailed { upstream, state, .. } => DeployflowError::UpstreamFailed {
                stage: definition.id.clone(),
                upstream,
                state,
            },
            _ => DeployflowError::UpstreamFailed {
                stage: definition.id.clone(),
                upstream: dep.clone(),
                state: StageState::SkippedDependencyMissing,
            },
        }
    }

    async fn verify_skipped(
        &self,
        definition: &StageDefinition,
        plan: &DeploymentPlan,
        inventory: &InventoryChecker,
    ) -> ValidationResult {
        let requesters: Vec<StageId> = self
            .catalog
            .transitive_dependents(&definition.id)
            .into_iter()
            .filter(|s| plan.is_requested(s.as_str()))
            .collect();

        if requesters.is_empty() {
            debug!(stage = %definition.id, "No requested dependents, skipping without inventory check");
            return ValidationResult::Ready;
        }

        for resource in self.required_resources(definition, &requesters) {
            match inventory.exists(&resource).await {
                Ok(true) => {}
                Ok(false) => {
                    return ValidationResult::Blocked(DeployflowError::MissingDependency {
                        stage: definition.id.clone(),
                        resource,
                    });
                }
                Err(err) => return ValidationResult::Blocked(err),
            }
        }

        ValidationResult::Ready
    }

    /// Resources a skipped stage must already provide.
    ///
    /// Its static outputs, plus every resource of a kind it produces that a
    /// requested dependent's descriptors reference.
    fn required_resources(&self, definition: &StageDefinition, requesters: &[StageId]) -> BTreeSet<ResourceReference> {
        let mut required = definition.outputs.clone();
        for requester in requesters {
            if let Some(resources) = self.demand.of(requester) {
                required.extend(
                    resources
                        .iter()
                        .filter(|r| definition.produces.contains(&r.kind))
                        .cloned(),
                );
            }
        }
        required
    }

    fn ordered_dependencies<'d>(&self, definition: &'d StageDefinition) -> Vec<&'d StageId> {
        let mut deps: Vec<&StageId> = definition.dependencies.iter().collect();
        deps.sort_by_key(|d| self.catalog.position(d.as_str()));
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::core::ResourceKind;
    use crate::errors::InventoryError;
    use crate::pipeline::plan;
    use crate::ports::MockResourceInventory;
    use std::sync::Arc;

    struct Fixture {
        catalog: StageCatalog,
        plan: DeploymentPlan,
        outcomes: OutcomeTable,
    }

    fn fixture(requested: &[&str]) -> Fixture {
        let catalog = StageCatalog::standard(&DeployConfig::default()).unwrap();
        let requested: BTreeSet<StageId> = requested.iter().copied().map(StageId::from).collect();
        let plan = plan(&requested, &catalog).unwrap();
        let outcomes = OutcomeTable::from_plan(&plan);
        Fixture { catalog, plan, outcomes }
    }

    fn inventory_with(present: &'static [&'static str]) -> InventoryChecker {
        let mut inventory = MockResourceInventory::new();
        inventory
            .expect_exists()
            .returning(move |_, name| Ok(present.contains(&name)));
        InventoryChecker::new(Arc::new(inventory))
    }

    fn weathertool_demand() -> DescriptorDemand {
        DescriptorDemand::new().with("agents", [ResourceReference::connection("weathertool")])
    }

    #[tokio::test]
    async fn test_skipped_stage_with_present_resource_is_ready() {
        let f = fixture(&["agents"]);
        let demand = weathertool_demand();
        let validator = StageValidator::new(&f.catalog, &demand);

        let result = validator
            .validate(&StageId::from("connections"), &f.plan, &f.outcomes, &inventory_with(&["weathertool"]))
            .await;

        assert!(result.is_ready());
    }

    #[tokio::test]
    async fn test_skipped_stage_with_absent_resource_is_blocked() {
        let f = fixture(&["agents"]);
        let demand = weathertool_demand();
        let validator = StageValidator::new(&f.catalog, &demand);

        let result = validator
            .validate(&StageId::from("connections"), &f.plan, &f.outcomes, &inventory_with(&[]))
            .await;

        match result {
            ValidationResult::Blocked(DeployflowError::MissingDependency { stage, resource }) => {
                assert_eq!(stage.as_str(), "connections");
                assert_eq!(resource, ResourceReference::connection("weathertool"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_skipped_stage_without_requester_is_not_checked() {
        let f = fixture(&["guardrails"]);
        let demand = DescriptorDemand::new();
        let validator = StageValidator::new(&f.catalog, &demand);

        let mut inventory = MockResourceInventory::new();
        inventory.expect_exists().never();
        let checker = InventoryChecker::new(Arc::new(inventory));

        let result = validator
            .validate(&StageId::from("agents"), &f.plan, &f.outcomes, &checker)
            .await;
        assert!(result.is_ready());
    }

    #[tokio::test]
    async fn test_inventory_error_fails_closed() {
        let f = fixture(&["agents"]);
        let demand = weathertool_demand();
        let validator = StageValidator::new(&f.catalog, &demand);

        let mut inventory = MockResourceInventory::new();
        inventory
            .expect_exists()
            .returning(|_, _| Err(InventoryError::Unauthorized("expired".to_string())));
        let checker = InventoryChecker::new(Arc::new(inventory));

        let result = validator
            .validate(&StageId::from("connections"), &f.plan, &f.outcomes, &checker)
            .await;
        assert!(matches!(
            result.reason(),
            Some(DeployflowError::InventoryUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_stage_propagates_missing_resource() {
        let mut f = fixture(&["agents"]);
        let demand = weathertool_demand();
        let validator = StageValidator::new(&f.catalog, &demand);

        f.outcomes
            .transition(&StageId::from("guardrails"), StageState::Skipped, None)
            .unwrap();
        f.outcomes
            .transition(
                &StageId::from("connections"),
                StageState::SkippedDependencyMissing,
                Some(DeployflowError::MissingDependency {
                    stage: StageId::from("connections"),
                    resource: ResourceReference::connection("weathertool"),
                }),
            )
            .unwrap();

        let result = validator
            .validate(&StageId::from("agents"), &f.plan, &f.outcomes, &inventory_with(&[]))
            .await;
        assert_eq!(
            result.reason().and_then(DeployflowError::missing_resource),
            Some(&ResourceReference::connection("weathertool"))
        );
    }

    #[tokio::test]
    async fn test_run_stage_blocked_by_failed_dependency() {
        let mut f = fixture(&["guardrails", "agents"]);
        let demand = DescriptorDemand::new();
        let validator = StageValidator::new(&f.catalog, &demand);

        f.outcomes
            .seed(&StageId::from("connections"), StageState::Failed, None)
            .unwrap();

        let result = validator
            .validate(&StageId::from("agents"), &f.plan, &f.outcomes, &inventory_with(&[]))
            .await;
        match result {
            ValidationResult::Blocked(DeployflowError::UpstreamFailed { stage, upstream, state }) => {
                assert_eq!(stage.as_str(), "agents");
                assert_eq!(upstream.as_str(), "connections");
                assert_eq!(state, StageState::Failed);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_stage_verifies_unresolved_skipped_dependency() {
        let f = fixture(&["agents"]);
        let demand = weathertool_demand();
        let validator = StageValidator::new(&f.catalog, &demand);

        let result = validator
            .validate(&StageId::from("agents"), &f.plan, &f.outcomes, &inventory_with(&[]))
            .await;
        assert!(matches!(
            result.reason(),
            Some(DeployflowError::MissingDependency { .. })
        ));

        let ready = validator
            .validate(&StageId::from("agents"), &f.plan, &f.outcomes, &inventory_with(&["weathertool"]))
            .await;
        assert!(ready.is_ready());
    }

    #[tokio::test]
    async fn test_static_outputs_are_checked() {
        let catalog = StageCatalog::builder()
            .stage(StageDefinition::new("guardrails").with_output(ResourceReference::guardrail("default-filter")))
            .unwrap()
            .stage(StageDefinition::new("agents").with_dependency("guardrails"))
            .unwrap()
            .build()
            .unwrap();
        let requested = BTreeSet::from([StageId::from("agents")]);
        let plan = plan(&requested, &catalog).unwrap();
        let outcomes = OutcomeTable::from_plan(&plan);
        let demand = DescriptorDemand::new();
        let validator = StageValidator::new(&catalog, &demand);

        let mut inventory = MockResourceInventory::new();
        inventory
            .expect_exists()
            .withf(|kind, name| *kind == ResourceKind::Guardrail && name == "default-filter")
            .times(1)
            .returning(|_, _| Ok(false));
        let checker = InventoryChecker::new(Arc::new(inventory));

        let result = validator
            .validate(&StageId::from("guardrails"), &plan, &outcomes, &checker)
            .await;
        assert!(!result.is_ready());
    }
}
