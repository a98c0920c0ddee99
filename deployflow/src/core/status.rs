//! Stage action and lifecycle state enums.

use crate::errors::DeployflowError;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::StageId;

/// What the plan decided to do with a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageAction {
    /// The stage was requested and will be deployed.
    Run,
    /// The stage was not requested; its resources are assumed to exist and are
    /// verified when a downstream requested stage needs them.
    SkipAssumeExisting,
}

impl StageAction {
    /// Returns true if the stage will be deployed.
    #[must_use]
    pub const fn is_run(self) -> bool {
        matches!(self, Self::Run)
    }
}

impl fmt::Display for StageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run => write!(f, "run"),
            Self::SkipAssumeExisting => write!(f, "skip-assume-existing"),
        }
    }
}

/// The lifecycle state of a stage within one invocation.
///
/// ```text
/// Pending -> Running -> Succeeded | Failed
/// Pending -> Skipped
/// Pending -> SkippedDependencyMissing
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    /// Planned but not yet resolved.
    #[default]
    Pending,
    /// The deployer is applying the stage.
    Running,
    /// The deployer reported success.
    Succeeded,
    /// The deployer reported failure.
    Failed,
    /// Not requested; everything downstream needs from it already exists.
    Skipped,
    /// Never attempted because a dependency is missing, unverifiable, or failed.
    SkippedDependencyMissing,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
            Self::SkippedDependencyMissing => write!(f, "skipped_dependency_missing"),
        }
    }
}

impl StageState {
    /// Returns true if the state represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Skipped | Self::SkippedDependencyMissing
        )
    }

    /// Returns true if downstream stages may rely on this stage.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped)
    }

    /// Returns true if the state blocks every dependent stage.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Failed | Self::SkippedDependencyMissing)
    }

    fn allowed_transitions(&self) -> &'static [StageState] {
        match self {
            Self::Pending => &[Self::Running, Self::Skipped, Self::SkippedDependencyMissing],
            Self::Running => &[Self::Succeeded, Self::Failed],
            Self::Succeeded | Self::Failed | Self::Skipped | Self::SkippedDependencyMissing => &[],
        }
    }

    /// Returns true if `self -> to` is a legal transition.
    #[must_use]
    pub fn can_transition(&self, to: StageState) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Validates a transition for the given stage.
    ///
    /// # Errors
    ///
    /// Returns [`DeployflowError::InvalidTransition`] if the transition is not allowed.
    pub fn validate_transition(&self, stage: &StageId, to: StageState) -> Result<(), DeployflowError> {
        if self.can_transition(to) {
            Ok(())
        } else {
            Err(DeployflowError::InvalidTransition {
                stage: stage.clone(),
                from: *self,
                to,
            })
        }
    }
}
