//! Inventory checks against the resource inventory.

use crate::core::ResourceReference;
use crate::errors::DeployflowError;
use crate::ports::ResourceInventory;
use std::sync::Arc;
use tracing::{debug, warn};

/// Checks resource existence, mapping inventory errors to
/// [`DeployflowError::InventoryUnavailable`].
///
/// A failed query is never read as "absent".
#[derive(Clone)]
pub struct InventoryChecker {
    inventory: Arc<dyn ResourceInventory>,
}

impl std::fmt::Debug for InventoryChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryChecker").finish_non_exhaustive()
    }
}

impl InventoryChecker {
    /// Creates a checker backed by the given inventory.
    #[must_use]
    pub fn new(inventory: Arc<dyn ResourceInventory>) -> Self {
        Self { inventory }
    }

    /// Returns true if the resource exists.
    ///
    /// # Errors
    ///
    /// Returns [`DeployflowError::InventoryUnavailable`] if the inventory could
    /// not answer.
    pub async fn exists(&self, resource: &ResourceReference) -> Result<bool, DeployflowError> {
        match self.inventory.exists(resource.kind, &resource.name).await {
            Ok(found) => {
                debug!(kind = %resource.kind, name = %resource.name, found, "Inventory check");
                Ok(found)
            }
            Err(source) => {
                warn!(
                    kind = %resource.kind,
                    name = %resource.name,
                    error = %source,
                    "Inventory unavailable"
                );
                Err(DeployflowError::InventoryUnavailable {
                    resource: resource.clone(),
                    source,
                })
            }
        }
    }
}
