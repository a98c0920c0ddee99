//! Deployment lifecycle events.
//!
//! The orchestrator reports every plan, stage transition and final summary as
//! a [`DeployEvent`] sent to an [`EventSink`].

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::core::{StageAction, StageId, StageState};
use crate::errors::DeployflowError;
use serde_json::json;

/// A lifecycle event.
#[derive(Debug, Clone)]
pub enum DeployEvent {
    /// The plan was computed.
    PlanCreated {
        /// Invocation id.
        run_id: uuid::Uuid,
        /// Every stage with its planned action.
        stages: Vec<(StageId, StageAction)>,
    },
    /// A stage started deploying.
    StageStarted {
        /// The stage.
        stage: StageId,
        /// Deployment name.
        deployment_name: String,
    },
    /// A stage deployed successfully.
    StageSucceeded {
        /// The stage.
        stage: StageId,
        /// Time spent deploying.
        duration_ms: f64,
    },
    /// A stage's deployment failed.
    StageFailed {
        /// The stage.
        stage: StageId,
        /// The failure.
        error: DeployflowError,
    },
    /// A stage was skipped with its resources present.
    StageSkipped {
        /// The stage.
        stage: StageId,
    },
    /// A stage was never attempted.
    StageBlocked {
        /// The stage.
        stage: StageId,
        /// Why.
        error: DeployflowError,
    },
    /// Every stage is terminal.
    Completed {
        /// Invocation id.
        run_id: uuid::Uuid,
        /// Process exit code for the run.
        exit_code: i32,
        /// Terminal state of every stage.
        states: Vec<(StageId, StageState)>,
    },
}

impl DeployEvent {
    /// Returns the event type string.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PlanCreated { .. } => "deploy.plan.created",
            Self::StageStarted { .. } => "deploy.stage.started",
            Self::StageSucceeded { .. } => "deploy.stage.succeeded",
            Self::StageFailed { .. } => "deploy.stage.failed",
            Self::StageSkipped { .. } => "deploy.stage.skipped",
            Self::StageBlocked { .. } => "deploy.stage.blocked",
            Self::Completed { .. } => "deploy.completed",
        }
    }

    /// Returns the event payload.
    #[must_use]
    pub fn data(&self) -> serde_json::Value {
        match self {
            Self::PlanCreated { run_id, stages } => json!({
                "run_id": run_id.to_string(),
                "stages": stages
                    .iter()
                    .map(|(s, a)| json!({"stage": s, "action": a}))
                    .collect::<Vec<_>>(),
            }),
            Self::StageStarted { stage, deployment_name } => json!({
                "stage": stage,
                "deployment_name": deployment_name,
            }),
            Self::StageSucceeded { stage, duration_ms } => json!({
                "stage": stage,
                "duration_ms": duration_ms,
            }),
            Self::StageFailed { stage, error } | Self::StageBlocked { stage, error } => {
                let info = error.error_info();
                json!({
                    "stage": stage,
                    "code": info.code,
                    "message": error.to_string(),
                    "resource": error.missing_resource().map(ToString::to_string),
                })
            }
            Self::StageSkipped { stage } => json!({ "stage": stage }),
            Self::Completed { run_id, exit_code, states } => json!({
                "run_id": run_id.to_string(),
                "exit_code": exit_code,
                "stages": states
                    .iter()
                    .map(|(s, st)| json!({"stage": s, "state": st}))
                    .collect::<Vec<_>>(),
            }),
        }
    }

    /// Sends the event to a sink.
    pub async fn send(&self, sink: &dyn EventSink) {
        sink.emit(self.event_type(), Some(self.data())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResourceReference;

    #[test]
    fn test_event_types() {
        let event = DeployEvent::StageSkipped {
            stage: StageId::from("guardrails"),
        };
        assert_eq!(event.event_type(), "deploy.stage.skipped");
        assert_eq!(event.data(), json!({"stage": "guardrails"}));
    }

    #[test]
    fn test_blocked_event_names_resource() {
        let event = DeployEvent::StageBlocked {
            stage: StageId::from("agents"),
            error: DeployflowError::MissingDependency {
                stage: StageId::from("connections"),
                resource: ResourceReference::connection("weathertool"),
            },
        };

        let data = event.data();
        assert_eq!(data["code"], "DEPLOY-006-MISSING_DEPENDENCY");
        assert_eq!(data["resource"], "connection 'weathertool'");
    }

    #[tokio::test]
    async fn test_send_to_collecting_sink() {
        let sink = CollectingEventSink::new();
        DeployEvent::Completed {
            run_id: uuid::Uuid::nil(),
            exit_code: 0,
            states: vec![(StageId::from("agents"), StageState::Succeeded)],
        }
        .send(&sink)
        .await;

        let events = sink.events();
        assert_eq!(events[0].0, "deploy.completed");
        assert_eq!(events[0].1.as_ref().unwrap()["stages"][0]["state"], "succeeded");
    }
}
