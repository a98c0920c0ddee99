//! Deployment summary.

use super::OutcomeTable;
use crate::config::Environment;
use crate::core::{ResourceHandle, ResourceReference, StageAction, StageId, StageState};
use crate::errors::DeployflowError;
use crate::pipeline::DeploymentPlan;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Operator facing detail of a stage failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// How to fix it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
    /// The resource that is missing or could not be verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_resource: Option<ResourceReference>,
}

impl From<&DeployflowError> for ErrorDetail {
    fn from(err: &DeployflowError) -> Self {
        let info = err.error_info();
        Self {
            code: info.code,
            message: err.to_string(),
            fix_hint: info.fix_hint,
            missing_resource: err.missing_resource().cloned(),
        }
    }
}

/// The terminal outcome of one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// The stage.
    pub stage: StageId,
    /// Position in the fixed total order.
    pub ordinal: usize,
    /// The planned action.
    pub action: StageAction,
    /// Whether the stage was requested.
    pub requested: bool,
    /// Terminal state.
    pub state: StageState,
    /// Whether the state was carried in from an earlier attempt.
    pub carried: bool,
    /// Failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<ErrorDetail>,
    /// What the deployer returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<ResourceHandle>,
    /// Time spent resolving the stage.
    pub duration_ms: f64,
    /// The underlying error.
    #[serde(skip)]
    pub error: Option<DeployflowError>,
}

impl StageReport {
    /// Returns true if the stage makes the run fail.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.requested && self.state.is_blocking()
    }
}

/// Summary of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    /// Invocation id.
    pub run_id: uuid::Uuid,
    /// Target environment.
    pub environment: Environment,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Total run time.
    pub duration_ms: f64,
    /// One entry per declared stage, in plan order.
    pub stages: Vec<StageReport>,
}

impl DeploymentReport {
    pub(crate) fn from_outcomes(
        run_id: uuid::Uuid,
        environment: Environment,
        started_at: DateTime<Utc>,
        duration_ms: f64,
        plan: &DeploymentPlan,
        outcomes: &OutcomeTable,
    ) -> Self {
        let stages = plan
            .entries()
            .iter()
            .filter_map(|entry| {
                let record = outcomes.record(entry.stage.as_str())?;
                Some(StageReport {
                    stage: entry.stage.clone(),
                    ordinal: entry.ordinal,
                    action: entry.action,
                    requested: entry.action.is_run(),
                    state: record.state,
                    carried: record.carried,
                    detail: record.error.as_ref().map(ErrorDetail::from),
                    handle: record.handle.clone(),
                    duration_ms: record.duration_ms,
                    error: record.error.clone(),
                })
            })
            .collect();

        Self {
            run_id,
            environment,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
            stages,
        }
    }

    /// Returns the report of a stage.
    #[must_use]
    pub fn stage(&self, id: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage.as_str() == id)
    }

    /// Returns the terminal state of a stage.
    #[must_use]
    pub fn state_of(&self, id: &str) -> Option<StageState> {
        self.stage(id).map(|s| s.state)
    }

    /// Returns the requested stages that failed or were blocked.
    pub fn failures(&self) -> impl Iterator<Item = &StageReport> {
        self.stages.iter().filter(|s| s.is_failure())
    }

    /// Returns true if no requested stage failed or was blocked.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Returns the process exit code: 0 on success, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_success())
    }

    /// Serializes the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DeployflowError::Internal`] if serialization fails.
    pub fn to_json(&self) -> Result<String, DeployflowError> {
        serde_json::to_string_pretty(self).map_err(|e| DeployflowError::Internal(e.to_string()))
    }
}

impl fmt::Display for DeploymentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Deployment {} ({}): {} in {:.0}ms",
            self.run_id,
            self.environment,
            if self.is_success() { "succeeded" } else { "failed" },
            self.duration_ms
        )?;

        for stage in &self.stages {
            write!(f, "  {:<14} {:<22} {}", stage.stage.as_str(), stage.action.to_string(), stage.state)?;
            if stage.carried {
                write!(f, " (carried)")?;
            }
            if let Some(detail) = &stage.detail {
                write!(f, "\n      [{}] {}", detail.code, detail.message)?;
                if let Some(hint) = &detail.fix_hint {
                    write!(f, "\n      hint: {hint}")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::pipeline::{plan, StageCatalog};
    use std::collections::BTreeSet;

    fn report_with(agents_state: StageState, error: Option<DeployflowError>) -> DeploymentReport {
        let catalog = StageCatalog::standard(&DeployConfig::default()).unwrap();
        let plan = plan(&BTreeSet::from([StageId::from("agents")]), &catalog).unwrap();
        let mut outcomes = OutcomeTable::from_plan(&plan);

        outcomes.transition(&StageId::from("guardrails"), StageState::Skipped, None).unwrap();
        outcomes.transition(&StageId::from("connections"), StageState::Skipped, None).unwrap();
        if agents_state == StageState::Succeeded {
            outcomes.transition(&StageId::from("agents"), StageState::Running, None).unwrap();
        }
        outcomes.transition(&StageId::from("agents"), agents_state, error).unwrap();

        DeploymentReport::from_outcomes(
            uuid::Uuid::nil(),
            Environment::Nonprod,
            Utc::now(),
            12.0,
            &plan,
            &outcomes,
        )
    }

    #[test]
    fn test_successful_report() {
        let report = report_with(StageState::Succeeded, None);

        assert!(report.is_success());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.stages.len(), 3);
        assert!(!report.stage("guardrails").unwrap().requested);
        assert!(report.to_string().contains("succeeded"));
    }

    #[test]
    fn test_blocked_report() {
        let report = report_with(
            StageState::SkippedDependencyMissing,
            Some(DeployflowError::MissingDependency {
                stage: StageId::from("connections"),
                resource: ResourceReference::connection("weathertool"),
            }),
        );

        assert_eq!(report.exit_code(), 1);
        let agents = report.stage("agents").unwrap();
        let detail = agents.detail.as_ref().unwrap();
        assert_eq!(detail.code, "DEPLOY-006-MISSING_DEPENDENCY");
        assert_eq!(detail.missing_resource, Some(ResourceReference::connection("weathertool")));

        let json = report.to_json().unwrap();
        assert!(json.contains("\"state\": \"skipped_dependency_missing\""));
        assert!(report.to_string().contains("DEPLOY-006-MISSING_DEPENDENCY"));
    }
}
