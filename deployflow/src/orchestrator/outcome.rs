//! Per-invocation stage outcome table.

use crate::core::{ResourceHandle, StageAction, StageId, StageState};
use crate::errors::DeployflowError;
use crate::pipeline::DeploymentPlan;

/// The outcome of one stage within an invocation.
#[derive(Debug, Clone)]
pub struct StageRecord {
    /// The stage.
    pub stage: StageId,
    /// The planned action.
    pub action: StageAction,
    /// Current lifecycle state.
    pub state: StageState,
    /// Why the stage failed or was blocked.
    pub error: Option<DeployflowError>,
    /// What the deployer returned.
    pub handle: Option<ResourceHandle>,
    /// Time spent resolving the stage.
    pub duration_ms: f64,
    /// Whether the state was carried in from an earlier attempt.
    pub carried: bool,
}

/// Outcomes of every planned stage, in plan order.
///
/// Only the orchestrator mutates the table, and only through validated
/// transitions.
#[derive(Debug, Clone)]
pub struct OutcomeTable {
    records: Vec<StageRecord>,
}

impl OutcomeTable {
    /// Creates a table with every planned stage `Pending`.
    #[must_use]
    pub fn from_plan(plan: &DeploymentPlan) -> Self {
        let records = plan
            .entries()
            .iter()
            .map(|entry| StageRecord {
                stage: entry.stage.clone(),
                action: entry.action,
                state: StageState::Pending,
                error: None,
                handle: None,
                duration_ms: 0.0,
                carried: false,
            })
            .collect();

        Self { records }
    }

    /// Returns the record of a stage.
    #[must_use]
    pub fn record(&self, stage: &str) -> Option<&StageRecord> {
        self.records.iter().find(|r| r.stage.as_str() == stage)
    }

    /// Returns the state of a stage.
    #[must_use]
    pub fn state(&self, stage: &str) -> Option<StageState> {
        self.record(stage).map(|r| r.state)
    }

    /// Returns the error recorded for a stage.
    #[must_use]
    pub fn error(&self, stage: &str) -> Option<&DeployflowError> {
        self.record(stage).and_then(|r| r.error.as_ref())
    }

    /// Returns every record in plan order.
    #[must_use]
    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    /// Returns true once every stage is terminal.
    #[must_use]
    pub fn all_terminal(&self) -> bool {
        self.records.iter().all(|r| r.state.is_terminal())
    }

    fn record_mut(&mut self, stage: &StageId) -> Result<&mut StageRecord, DeployflowError> {
        self.records
            .iter_mut()
            .find(|r| &r.stage == stage)
            .ok_or_else(|| DeployflowError::Internal(format!("stage '{stage}' is not in the plan")))
    }

    /// Moves a stage to a new state.
    pub(crate) fn transition(
        &mut self,
        stage: &StageId,
        to: StageState,
        error: Option<DeployflowError>,
    ) -> Result<(), DeployflowError> {
        let record = self.record_mut(stage)?;
        record.state.validate_transition(stage, to)?;
        record.state = to;
        if error.is_some() {
            record.error = error;
        }
        Ok(())
    }

    /// Seeds a terminal state carried in from an earlier attempt.
    pub(crate) fn seed(
        &mut self,
        stage: &StageId,
        state: StageState,
        error: Option<DeployflowError>,
    ) -> Result<(), DeployflowError> {
        if !state.is_terminal() {
            return Err(DeployflowError::Configuration(format!(
                "carried outcome for stage '{stage}' must be terminal, got {state}"
            )));
        }

        let record = self.record_mut(stage)?;
        if record.state != StageState::Pending {
            return Err(DeployflowError::InvalidTransition {
                stage: stage.clone(),
                from: record.state,
                to: state,
            });
        }
        record.state = state;
        record.error = error;
        record.carried = true;
        Ok(())
    }

    pub(crate) fn set_handle(&mut self, stage: &StageId, handle: ResourceHandle) -> Result<(), DeployflowError> {
        self.record_mut(stage)?.handle = Some(handle);
        Ok(())
    }

    pub(crate) fn set_duration(&mut self, stage: &StageId, duration_ms: f64) -> Result<(), DeployflowError> {
        self.record_mut(stage)?.duration_ms = duration_ms;
        Ok(())
    }
}
