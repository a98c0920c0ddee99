//! Assertion helpers for deployment reports.

use crate::core::{ResourceReference, StageState};
use crate::orchestrator::{DeploymentReport, StageReport};

fn stage_of<'a>(report: &'a DeploymentReport, stage: &str) -> &'a StageReport {
    match report.stage(stage) {
        Some(s) => s,
        None => panic!("Stage '{stage}' not in report"),
    }
}

/// Asserts that `stage` ended in `expected`.
///
/// # Panics
///
/// Panics if the stage is absent or in another state.
pub fn assert_stage_state(report: &DeploymentReport, stage: &str, expected: StageState) {
    let actual = stage_of(report, stage);
    assert_eq!(
        actual.state, expected,
        "Expected stage '{stage}' to be {expected}, got {} ({:?})",
        actual.state, actual.detail
    );
}

/// Asserts that `stage` was blocked because `resource` is missing.
///
/// # Panics
///
/// Panics if the stage is not `SkippedDependencyMissing` on that resource.
pub fn assert_blocked_on(report: &DeploymentReport, stage: &str, resource: &ResourceReference) {
    assert_stage_state(report, stage, StageState::SkippedDependencyMissing);
    let missing = stage_of(report, stage)
        .detail
        .as_ref()
        .and_then(|d| d.missing_resource.as_ref());
    assert_eq!(
        missing,
        Some(resource),
        "Expected stage '{stage}' to be blocked on {resource}"
    );
}

/// Asserts the error code recorded for `stage`.
///
/// # Panics
///
/// Panics if the stage has no error or another code.
pub fn assert_error_code(report: &DeploymentReport, stage: &str, code: &str) {
    let detail = stage_of(report, stage).detail.as_ref();
    assert_eq!(
        detail.map(|d| d.code.as_str()),
        Some(code),
        "Expected stage '{stage}' to carry error code {code}"
    );
}

/// Asserts every stage state in plan order.
///
/// # Panics
///
/// Panics on the first mismatch.
pub fn assert_states(report: &DeploymentReport, expected: &[(&str, StageState)]) {
    assert_eq!(report.stages.len(), expected.len(), "Stage count mismatch");
    for (actual, (stage, state)) in report.stages.iter().zip(expected) {
        assert_eq!(actual.stage.as_str(), *stage, "Unexpected plan order");
        assert_stage_state(report, stage, *state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::DeploymentRequest;
    use crate::testing::DeployHarness;

    #[tokio::test]
    async fn test_assert_states_on_successful_run() {
        let harness = DeployHarness::new();
        let report = harness
            .orchestrator()
            .run(&DeploymentRequest::new(["guardrails"]))
            .await
            .unwrap();

        assert_states(
            &report,
            &[
                ("guardrails", StageState::Succeeded),
                ("connections", StageState::Skipped),
                ("agents", StageState::Skipped),
            ],
        );
    }

    #[tokio::test]
    #[should_panic(expected = "Expected stage 'guardrails' to be skipped")]
    async fn test_assert_stage_state_mismatch() {
        let harness = DeployHarness::new();
        let report = harness
            .orchestrator()
            .run(&DeploymentRequest::new(["guardrails"]))
            .await
            .unwrap();

        assert_stage_state(&report, "guardrails", StageState::Skipped);
    }
}
