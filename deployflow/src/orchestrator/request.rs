//! Deployment requests.

use crate::core::{StageId, StageState};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// A terminal outcome from an earlier, separate attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarriedOutcome {
    /// The terminal state the stage ended in.
    pub state: StageState,
    /// Operator supplied detail.
    #[serde(default)]
    pub detail: String,
}

/// What one invocation should deploy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    /// The requested stages.
    pub stages: BTreeSet<StageId>,
    /// Descriptor files attached to stages.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub descriptors: BTreeMap<StageId, Vec<PathBuf>>,
    /// Outcomes carried in from earlier attempts.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub carried_outcomes: BTreeMap<StageId, CarriedOutcome>,
}

impl DeploymentRequest {
    /// Creates a request for the given stages.
    #[must_use]
    pub fn new(stages: impl IntoIterator<Item = impl Into<StageId>>) -> Self {
        Self {
            stages: stages.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Requests one more stage.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<StageId>) -> Self {
        self.stages.insert(stage.into());
        self
    }

    /// Attaches a descriptor file to a stage.
    #[must_use]
    pub fn with_descriptor(mut self, stage: impl Into<StageId>, path: impl Into<PathBuf>) -> Self {
        self.descriptors.entry(stage.into()).or_default().push(path.into());
        self
    }

    /// Carries in an outcome from an earlier attempt.
    #[must_use]
    pub fn with_carried_outcome(
        mut self,
        stage: impl Into<StageId>,
        state: StageState,
        detail: impl Into<String>,
    ) -> Self {
        self.carried_outcomes.insert(
            stage.into(),
            CarriedOutcome {
                state,
                detail: detail.into(),
            },
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let request = DeploymentRequest::new(["guardrails"])
            .with_stage("agents")
            .with_descriptor("agents", "agents/weather.yaml")
            .with_descriptor("agents", "agents/search.yaml")
            .with_carried_outcome("connections", StageState::Failed, "quota exceeded");

        assert_eq!(request.stages.len(), 2);
        assert_eq!(request.descriptors[&StageId::from("agents")].len(), 2);
        assert_eq!(
            request.carried_outcomes[&StageId::from("connections")].state,
            StageState::Failed
        );
    }

    #[test]
    fn test_request_from_json() {
        let request: DeploymentRequest = serde_json::from_str(
            r#"{
                "stages": ["agents"],
                "carried_outcomes": {"connections": {"state": "failed"}}
            }"#,
        )
        .unwrap();

        assert!(request.stages.contains(&StageId::from("agents")));
        assert_eq!(request.carried_outcomes[&StageId::from("connections")].detail, "");
    }
}
