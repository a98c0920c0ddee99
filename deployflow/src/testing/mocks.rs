//! In-memory collaborators for testing.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::core::{ResourceHandle, ResourceKind, ResourceReference, StageId};
use crate::descriptor::Descriptor;
use crate::errors::{DeployError, InventoryError, ParseError};
use crate::ports::{DeployRequest, DescriptorLoader, ResourceDeployer, ResourceInventory};

/// An inventory backed by an in-memory set.
#[derive(Debug, Default)]
pub struct InMemoryInventory {
    resources: RwLock<BTreeSet<ResourceReference>>,
    outage: Mutex<Option<InventoryError>>,
    queries: Mutex<Vec<ResourceReference>>,
}

impl InMemoryInventory {
    /// Creates an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an inventory holding the given resources.
    #[must_use]
    pub fn with_resources(resources: impl IntoIterator<Item = ResourceReference>) -> Self {
        let inventory = Self::new();
        inventory.resources.write().extend(resources);
        inventory
    }

    /// Adds a resource.
    pub fn insert(&self, resource: ResourceReference) {
        self.resources.write().insert(resource);
    }

    /// Makes every query fail with `error` until [`InMemoryInventory::restore`].
    pub fn fail_with(&self, error: InventoryError) {
        *self.outage.lock() = Some(error);
    }

    /// Ends a simulated outage.
    pub fn restore(&self) {
        *self.outage.lock() = None;
    }

    /// Returns every query made, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<ResourceReference> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl ResourceInventory for InMemoryInventory {
    async fn exists(&self, kind: ResourceKind, name: &str) -> Result<bool, InventoryError> {
        let resource = ResourceReference::new(kind, name);
        self.queries.lock().push(resource.clone());

        if let Some(error) = self.outage.lock().clone() {
            return Err(error);
        }
        Ok(self.resources.read().contains(&resource))
    }
}

/// A deployer that records every request and fails configured stages.
#[derive(Debug, Default)]
pub struct RecordingDeployer {
    requests: Mutex<Vec<DeployRequest>>,
    failures: Mutex<HashMap<StageId, DeployError>>,
}

impl RecordingDeployer {
    /// Creates a deployer where every stage succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes deployments of `stage` fail.
    pub fn fail_stage(&self, stage: impl Into<StageId>, error: DeployError) {
        self.failures.lock().insert(stage.into(), error);
    }

    /// Returns every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<DeployRequest> {
        self.requests.lock().clone()
    }

    /// Returns the stages deployed, in order.
    #[must_use]
    pub fn deployed_stages(&self) -> Vec<StageId> {
        self.requests.lock().iter().map(|r| r.stage.clone()).collect()
    }

    /// Returns true if `stage` was deployed.
    #[must_use]
    pub fn was_deployed(&self, stage: &str) -> bool {
        self.requests.lock().iter().any(|r| r.stage.as_str() == stage)
    }
}

#[async_trait]
impl ResourceDeployer for RecordingDeployer {
    async fn deploy(&self, request: &DeployRequest) -> Result<ResourceHandle, DeployError> {
        self.requests.lock().push(request.clone());

        if let Some(error) = self.failures.lock().get(&request.stage) {
            return Err(error.clone());
        }

        Ok(ResourceHandle::new(format!(
            "/resourceGroups/{}/deployments/{}",
            request.resource_group, request.deployment_name
        ))
        .with_name(request.deployment_name.clone()))
    }
}

/// A descriptor loader serving fixed results by path.
#[derive(Debug, Default)]
pub struct StaticDescriptorLoader {
    entries: RwLock<HashMap<PathBuf, Result<Descriptor, ParseError>>>,
}

impl StaticDescriptorLoader {
    /// Creates an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `descriptor` for `path`.
    #[must_use]
    pub fn with_descriptor(self, path: impl Into<PathBuf>, descriptor: Descriptor) -> Self {
        self.entries.write().insert(path.into(), Ok(descriptor));
        self
    }

    /// Serves `error` for `path`.
    #[must_use]
    pub fn with_error(self, path: impl Into<PathBuf>, error: ParseError) -> Self {
        self.entries.write().insert(path.into(), Err(error));
        self
    }
}

impl DescriptorLoader for StaticDescriptorLoader {
    fn load(&self, path: &Path) -> Result<Descriptor, ParseError> {
        match self.entries.read().get(path) {
            Some(Ok(descriptor)) => {
                let mut descriptor = descriptor.clone();
                descriptor.source = Some(path.to_path_buf());
                Ok(descriptor)
            }
            Some(Err(error)) => Err(error.clone()),
            None => Err(ParseError::NotFound {
                path: path.to_path_buf(),
            }),
        }
    }
}
