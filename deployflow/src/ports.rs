//! Collaborator ports consumed by the orchestrator.
//!
//! The orchestrator never talks to a cloud SDK directly. It receives a
//! deployer, an inventory and a descriptor loader through these traits; the
//! in-memory versions in [`crate::testing`] back the tests.

use crate::core::{ResourceHandle, ResourceKind, StageId};
use crate::descriptor::Descriptor;
use crate::errors::{DeployError, InventoryError, ParseError};
use crate::pipeline::{ParameterSet, TemplateRef};
use async_trait::async_trait;
use std::path::Path;

/// Everything a deployer needs to apply one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployRequest {
    /// The stage being deployed.
    pub stage: StageId,
    /// Deployment name, `{stage}-{environment}`.
    pub deployment_name: String,
    /// Target resource group.
    pub resource_group: String,
    /// Agent service endpoint, when configured.
    pub endpoint: Option<String>,
    /// The template to apply.
    pub template: TemplateRef,
    /// The parameters to apply it with.
    pub parameters: ParameterSet,
    /// Descriptors attached to the stage.
    pub descriptors: Vec<Descriptor>,
    /// Id of the invocation this request belongs to.
    pub run_id: uuid::Uuid,
}

/// Applies a stage's template and parameters.
///
/// A call may take minutes; the orchestrator awaits it without a timeout and
/// never retries a failure.
#[async_trait]
pub trait ResourceDeployer: Send + Sync {
    /// Deploys a stage.
    ///
    /// # Errors
    ///
    /// Returns a [`DeployError`] if the provider reports failure.
    async fn deploy(&self, request: &DeployRequest) -> Result<ResourceHandle, DeployError>;
}

/// Answers whether a resource already exists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceInventory: Send + Sync {
    /// Returns true if a resource of `kind` named `name` exists.
    ///
    /// # Errors
    ///
    /// Returns an [`InventoryError`] if the question cannot be answered.
    async fn exists(&self, kind: ResourceKind, name: &str) -> Result<bool, InventoryError>;
}

/// Loads an agent descriptor from a path.
pub trait DescriptorLoader: Send + Sync {
    /// Loads and validates the descriptor at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the file is missing or invalid.
    fn load(&self, path: &Path) -> Result<Descriptor, ParseError>;
}
