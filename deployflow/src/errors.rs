//! Error types for deployflow.
//!
//! [`DeployflowError`] is the single taxonomy the orchestrator reports. The
//! collaborator errors ([`DeployError`], [`InventoryError`], [`ParseError`]) are
//! what the deployer, inventory and descriptor loader return; the core wraps
//! them without ever retrying.

use crate::core::{ResourceReference, StageId, StageState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for deployflow operations.
#[derive(Debug, Clone, Error)]
pub enum DeployflowError {
    /// A requested stage is not declared in the catalog.
    #[error("Unknown stage '{stage}' (declared stages: {})", declared.join(", "))]
    UnknownStage {
        /// The unknown stage id.
        stage: StageId,
        /// Every declared stage id, in order.
        declared: Vec<String>,
    },

    /// The stage dependency graph contains a cycle.
    #[error("{0}")]
    CyclicDependency(#[from] CycleDetectedError),

    /// The stage catalog is otherwise invalid.
    #[error("{0}")]
    InvalidCatalog(#[from] CatalogValidationError),

    /// A consumer descriptor references a dependency without a usable name.
    #[error("Malformed descriptor '{descriptor}': {reason}")]
    MalformedDescriptor {
        /// The descriptor name (or path when the name is unknown).
        descriptor: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A descriptor could not be loaded.
    #[error("{0}")]
    DescriptorParse(#[from] ParseError),

    /// The resource inventory could not answer; treated as blocking.
    #[error("Resource inventory unavailable while checking {resource}: {source}")]
    InventoryUnavailable {
        /// The resource being checked.
        resource: ResourceReference,
        /// The underlying inventory error.
        #[source]
        source: InventoryError,
    },

    /// A resource a stage relies on is confirmed absent.
    #[error("Stage '{stage}' requires {resource}, which does not exist")]
    MissingDependency {
        /// The stage that would have produced the resource.
        stage: StageId,
        /// The missing resource.
        resource: ResourceReference,
    },

    /// An upstream stage failed or was blocked.
    #[error("Stage '{stage}' not attempted: upstream stage '{upstream}' ended in {state}")]
    UpstreamFailed {
        /// The blocked stage.
        stage: StageId,
        /// The upstream stage that failed.
        upstream: StageId,
        /// The upstream terminal state.
        state: StageState,
    },

    /// The resource deployer reported failure.
    #[error("Deployment of stage '{stage}' failed: {source}")]
    DeployFailed {
        /// The stage being deployed.
        stage: StageId,
        /// The deployer error.
        #[source]
        source: DeployError,
    },

    /// A terminal outcome carried in from an earlier attempt.
    #[error("Stage '{stage}' ended in {state} in an earlier attempt: {detail}")]
    PriorAttempt {
        /// The stage.
        stage: StageId,
        /// The carried-in state.
        state: StageState,
        /// Operator supplied detail.
        detail: String,
    },

    /// An illegal lifecycle transition was attempted.
    #[error("Invalid state transition for stage '{stage}': {from} -> {to}")]
    InvalidTransition {
        /// The stage.
        stage: StageId,
        /// Current state.
        from: StageState,
        /// Requested state.
        to: StageState,
    },

    /// Invalid configuration or request.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployflowError {
    /// Returns the missing resource, if this error names one.
    #[must_use]
    pub fn missing_resource(&self) -> Option<&ResourceReference> {
        match self {
            Self::MissingDependency { resource, .. }
            | Self::InventoryUnavailable { resource, .. } => Some(resource),
            _ => None,
        }
    }

    /// Returns true for errors raised before any deployment starts.
    #[must_use]
    pub fn is_configuration_time(&self) -> bool {
        matches!(
            self,
            Self::UnknownStage { .. }
                | Self::CyclicDependency(_)
                | Self::InvalidCatalog(_)
                | Self::Configuration(_)
        )
    }

    /// Returns operator facing diagnostics for this error.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        match self {
            Self::UnknownStage { stage, declared } => {
                ContractErrorInfo::new("DEPLOY-001-UNKNOWN_STAGE", self.to_string())
                    .with_fix_hint(format!("Request only declared stages: {}.", declared.join(", ")))
                    .with_context_entry("stage", stage.as_str())
            }
            Self::CyclicDependency(err) => err.error_info.clone(),
            Self::InvalidCatalog(err) => err
                .error_info
                .clone()
                .unwrap_or_else(|| ContractErrorInfo::new("DEPLOY-003-CATALOG", self.to_string())),
            Self::MalformedDescriptor { descriptor, .. } => {
                ContractErrorInfo::new("DEPLOY-004-MALFORMED_DESCRIPTOR", self.to_string())
                    .with_fix_hint("Give every tool and connection reference an identifying name.")
                    .with_context_entry("descriptor", descriptor.as_str())
            }
            Self::DescriptorParse(err) => {
                ContractErrorInfo::new("DEPLOY-004-MALFORMED_DESCRIPTOR", self.to_string())
                    .with_fix_hint("Fix the agent definition file; `name` and `model.id` are required.")
                    .with_context_entry("path", err.path().display().to_string())
            }
            Self::InventoryUnavailable { resource, .. } => {
                ContractErrorInfo::new("DEPLOY-005-INVENTORY_UNAVAILABLE", self.to_string())
                    .with_fix_hint("Check credentials and connectivity to the resource inventory, then re-run.")
                    .with_context_entry("resource", resource.to_string())
            }
            Self::MissingDependency { stage, resource } => {
                ContractErrorInfo::new("DEPLOY-006-MISSING_DEPENDENCY", self.to_string())
                    .with_fix_hint(format!(
                        "Deploy {resource} first, or re-run with stage '{stage}' selected."
                    ))
                    .with_context_entry("stage", stage.as_str())
                    .with_context_entry("resource", resource.name.as_str())
            }
            Self::UpstreamFailed { upstream, .. } => {
                ContractErrorInfo::new("DEPLOY-007-UPSTREAM_FAILED", self.to_string())
                    .with_fix_hint(format!("Fix stage '{upstream}' and re-run it together with this stage."))
                    .with_context_entry("upstream", upstream.as_str())
            }
            Self::DeployFailed { stage, .. } => {
                ContractErrorInfo::new("DEPLOY-008-DEPLOY_FAILED", self.to_string())
                    .with_fix_hint(format!("Inspect the deployment of stage '{stage}' and re-run it."))
                    .with_context_entry("stage", stage.as_str())
            }
            Self::PriorAttempt { stage, .. } => {
                ContractErrorInfo::new("DEPLOY-009-PRIOR_ATTEMPT", self.to_string())
                    .with_fix_hint(format!("Re-run with stage '{stage}' selected."))
                    .with_context_entry("stage", stage.as_str())
            }
            Self::InvalidTransition { .. } | Self::Internal(_) => {
                ContractErrorInfo::new("DEPLOY-900-INTERNAL", self.to_string())
            }
            Self::Configuration(_) => ContractErrorInfo::new("DEPLOY-010-CONFIG", self.to_string()),
        }
    }
}

/// Metadata about an error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "DEPLOY-006-MISSING_DEPENDENCY").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when the stage catalog fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CatalogValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl CatalogValidationError {
    /// Creates a new catalog validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }
}

/// Error raised when a cycle is detected in the stage graph.
///
/// The participants are every stage a topological sort could not reach.
#[derive(Debug, Clone, Error)]
#[error("Dependency cycle among stages: {}", participants.join(", "))]
pub struct CycleDetectedError {
    /// Stages that are part of, or stuck behind, a cycle.
    pub participants: Vec<String>,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(mut participants: Vec<String>) -> Self {
        participants.sort();
        let info = ContractErrorInfo::new(
            "DEPLOY-002-CYCLE",
            format!("Stage graph contains a dependency cycle among: {}", participants.join(", ")),
        )
        .with_fix_hint("Remove one of the dependencies in the cycle to break it.");

        Self {
            participants,
            error_info: info,
        }
    }
}

/// Error returned by a resource deployer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DeployError {
    /// What went wrong.
    pub message: String,
    /// Provisioning state reported by the provider, when one was read back.
    pub provisioning_state: Option<String>,
}

impl DeployError {
    /// Creates a new deploy error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            provisioning_state: None,
        }
    }

    /// Sets the provisioning state.
    #[must_use]
    pub fn with_provisioning_state(mut self, state: impl Into<String>) -> Self {
        self.provisioning_state = Some(state.into());
        self
    }
}

/// Error returned by a resource inventory query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// The inventory endpoint could not be reached.
    #[error("inventory unreachable: {0}")]
    Unreachable(String),

    /// The caller is not authorised to query the inventory.
    #[error("inventory query unauthorised: {0}")]
    Unauthorized(String),

    /// The query failed for another reason.
    #[error("inventory query failed: {0}")]
    Query(String),
}

/// Error returned by a descriptor loader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The descriptor file does not exist.
    #[error("Agent descriptor not found at {}", path.display())]
    NotFound {
        /// The path.
        path: PathBuf,
    },

    /// The descriptor file could not be read.
    #[error("Failed to read agent descriptor {}: {message}", path.display())]
    Io {
        /// The path.
        path: PathBuf,
        /// The IO error message.
        message: String,
    },

    /// The descriptor file is empty.
    #[error("Agent descriptor is empty: {}", path.display())]
    Empty {
        /// The path.
        path: PathBuf,
    },

    /// The descriptor is not valid YAML or does not match the schema.
    #[error("Invalid agent descriptor {}: {message}", path.display())]
    Syntax {
        /// The path.
        path: PathBuf,
        /// The parser message.
        message: String,
    },

    /// A required field is missing.
    #[error("Missing required field '{field}' in agent descriptor {}", path.display())]
    MissingField {
        /// The path.
        path: PathBuf,
        /// The field.
        field: String,
    },

    /// A field has the wrong shape.
    #[error("Invalid field '{field}' in agent descriptor {}: {message}", path.display())]
    InvalidField {
        /// The path.
        path: PathBuf,
        /// The field.
        field: String,
        /// What is wrong.
        message: String,
    },
}

impl ParseError {
    /// Returns the descriptor path this error refers to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound { path }
            | Self::Io { path, .. }
            | Self::Empty { path }
            | Self::Syntax { path, .. }
            | Self::MissingField { path, .. }
            | Self::InvalidField { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_error_info_creation() {
        let info = ContractErrorInfo::new("TEST-001", "Test error")
            .with_fix_hint("Fix this by doing that")
            .with_context_entry("stage", "agents");

        assert_eq!(info.code, "TEST-001");
        assert_eq!(info.summary, "Test error");
        assert_eq!(info.fix_hint, Some("Fix this by doing that".to_string()));
        assert_eq!(info.context.get("stage"), Some(&"agents".to_string()));
    }

    #[test]
    fn test_cycle_detected_error_sorts_participants() {
        let err = CycleDetectedError::new(vec!["c".to_string(), "a".to_string(), "b".to_string()]);

        assert_eq!(err.to_string(), "Dependency cycle among stages: a, b, c");
        assert_eq!(err.error_info.code, "DEPLOY-002-CYCLE");
    }

    #[test]
    fn test_missing_dependency_names_resource() {
        let err = DeployflowError::MissingDependency {
            stage: StageId::from("connections"),
            resource: ResourceReference::connection("weathertool"),
        };

        assert_eq!(
            err.missing_resource(),
            Some(&ResourceReference::connection("weathertool"))
        );
        let info = err.error_info();
        assert_eq!(info.code, "DEPLOY-006-MISSING_DEPENDENCY");
        assert_eq!(info.context.get("resource"), Some(&"weathertool".to_string()));
        assert!(info.fix_hint.unwrap().contains("stage 'connections'"));
    }

    #[test]
    fn test_inventory_unavailable_is_distinct_from_absent() {
        let err = DeployflowError::InventoryUnavailable {
            resource: ResourceReference::connection("weathertool"),
            source: InventoryError::Unauthorized("token expired".to_string()),
        };

        assert!(err.to_string().contains("unavailable"));
        assert_eq!(err.error_info().code, "DEPLOY-005-INVENTORY_UNAVAILABLE");
    }

    #[test]
    fn test_configuration_time_errors() {
        let unknown = DeployflowError::UnknownStage {
            stage: StageId::from("network"),
            declared: vec!["guardrails".to_string()],
        };
        assert!(unknown.is_configuration_time());
        assert!(unknown.to_string().contains("declared stages: guardrails"));

        let deploy = DeployflowError::DeployFailed {
            stage: StageId::from("agents"),
            source: DeployError::new("quota exceeded"),
        };
        assert!(!deploy.is_configuration_time());
    }

    #[test]
    fn test_parse_error_path() {
        let err = ParseError::MissingField {
            path: PathBuf::from("agent.yaml"),
            field: "model".to_string(),
        };
        assert_eq!(err.path(), std::path::Path::new("agent.yaml"));
        assert!(err.to_string().contains("'model'"));
    }
}
