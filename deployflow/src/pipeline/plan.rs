//! Deployment planning.
//!
//! Planning is a pure function of the requested stage set and the catalog: no
//! inventory is consulted. The resulting [`DeploymentPlan`] has no mutating API.

use super::StageCatalog;
use crate::core::{StageAction, StageId};
use crate::errors::DeployflowError;
use serde::Serialize;
use std::collections::BTreeSet;

/// One entry of a deployment plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStage {
    /// The stage id.
    pub stage: StageId,
    /// Position in the fixed total order.
    pub ordinal: usize,
    /// Whether the stage runs or is assumed to exist.
    pub action: StageAction,
}

/// The ordered, immutable schedule of run/skip decisions for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentPlan {
    entries: Vec<PlannedStage>,
}

impl DeploymentPlan {
    /// Returns every entry in plan order.
    #[must_use]
    pub fn entries(&self) -> &[PlannedStage] {
        &self.entries
    }

    /// Returns the entry for a stage.
    #[must_use]
    pub fn get(&self, stage: &str) -> Option<&PlannedStage> {
        self.entries.iter().find(|e| e.stage.as_str() == stage)
    }

    /// Returns the planned action of a stage.
    #[must_use]
    pub fn action_of(&self, stage: &str) -> Option<StageAction> {
        self.get(stage).map(|e| e.action)
    }

    /// Returns true if the stage was requested.
    #[must_use]
    pub fn is_requested(&self, stage: &str) -> bool {
        self.action_of(stage).is_some_and(StageAction::is_run)
    }

    /// Returns the requested stage ids in plan order.
    #[must_use]
    pub fn requested(&self) -> Vec<&StageId> {
        self.entries
            .iter()
            .filter(|e| e.action.is_run())
            .map(|e| &e.stage)
            .collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the plan is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Computes the deployment plan for a requested stage set.
///
/// Every declared stage appears once, in declared order; a stage runs iff it
/// was requested and is otherwise assumed to exist.
///
/// # Errors
///
/// Returns [`DeployflowError::UnknownStage`] for the first requested id that is
/// not declared.
pub fn plan(
    requested: &BTreeSet<StageId>,
    catalog: &StageCatalog,
) -> Result<DeploymentPlan, DeployflowError> {
    if let Some(unknown) = requested.iter().find(|id| !catalog.contains(id.as_str())) {
        return Err(DeployflowError::UnknownStage {
            stage: unknown.clone(),
            declared: catalog.ids().iter().map(ToString::to_string).collect(),
        });
    }

    let entries = catalog
        .stages()
        .iter()
        .enumerate()
        .map(|(ordinal, def)| PlannedStage {
            stage: def.id.clone(),
            ordinal,
            action: if requested.contains(&def.id) {
                StageAction::Run
            } else {
                StageAction::SkipAssumeExisting
            },
        })
        .collect();

    Ok(DeploymentPlan { entries })
}
