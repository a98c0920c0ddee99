//! Test fixtures and the orchestrator harness.

use std::sync::Arc;

use super::{InMemoryInventory, RecordingDeployer, StaticDescriptorLoader};
use crate::config::{DeployConfig, DEFAULT_GUARDRAIL_POLICY};
use crate::core::ResourceReference;
use crate::descriptor::{Descriptor, ToolEntry};
use crate::events::CollectingEventSink;
use crate::orchestrator::Orchestrator;
use crate::pipeline::StageCatalog;

/// Path the weather agent descriptor is served from.
pub const WEATHER_AGENT_PATH: &str = "agents/weather.yaml";

/// YAML of an agent using the `weathertool` connection.
pub const WEATHER_AGENT_YAML: &str = r"
name: weather-agent
model:
  id: gpt-4o
instructions: Answer questions about the weather.
tools:
  - type: openapi
    id: weather
    options:
      specification: https://example.com/weather/openapi.json
      connection_id: weathertool
";

/// Returns the standard catalog with default configuration.
///
/// # Panics
///
/// Never for the built-in table.
#[must_use]
#[allow(clippy::expect_used)]
pub fn standard_catalog() -> StageCatalog {
    StageCatalog::standard(&DeployConfig::default()).expect("standard catalog is valid")
}

/// Returns the guardrail the standard guardrails stage provides.
#[must_use]
pub fn standard_guardrail() -> ResourceReference {
    ResourceReference::guardrail(DEFAULT_GUARDRAIL_POLICY)
}

/// Returns an agent descriptor that depends on the `weathertool` connection.
#[must_use]
pub fn weather_descriptor() -> Descriptor {
    Descriptor::new("weather-agent", "gpt-4o").with_tool(
        ToolEntry::new("openapi")
            .with_id("weather")
            .with_option(
                "specification",
                serde_json::json!("https://example.com/weather/openapi.json"),
            )
            .with_option("connection_id", serde_json::json!("weathertool")),
    )
}

/// Wires an orchestrator to in-memory collaborators.
#[derive(Debug)]
pub struct DeployHarness {
    /// The catalog.
    pub catalog: Arc<StageCatalog>,
    /// The configuration.
    pub config: DeployConfig,
    /// The inventory.
    pub inventory: Arc<InMemoryInventory>,
    /// The deployer.
    pub deployer: Arc<RecordingDeployer>,
    /// The descriptor loader.
    pub loader: Arc<StaticDescriptorLoader>,
    /// The collected events.
    pub events: Arc<CollectingEventSink>,
}

impl DeployHarness {
    /// Creates a harness over the standard catalog. The inventory holds
    /// [`standard_guardrail`]; the loader serves [`weather_descriptor`] at
    /// [`WEATHER_AGENT_PATH`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(standard_catalog()),
            config: DeployConfig::default(),
            inventory: Arc::new(InMemoryInventory::with_resources([standard_guardrail()])),
            deployer: Arc::new(RecordingDeployer::new()),
            loader: Arc::new(
                StaticDescriptorLoader::new().with_descriptor(WEATHER_AGENT_PATH, weather_descriptor()),
            ),
            events: Arc::new(CollectingEventSink::new()),
        }
    }

    /// Replaces the catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: StageCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: DeployConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the inventory.
    #[must_use]
    pub fn with_inventory(mut self, inventory: InMemoryInventory) -> Self {
        self.inventory = Arc::new(inventory);
        self
    }

    /// Replaces the descriptor loader.
    #[must_use]
    pub fn with_loader(mut self, loader: StaticDescriptorLoader) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    /// Builds an orchestrator sharing the harness collaborators.
    #[must_use]
    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            Arc::clone(&self.catalog),
            self.config.clone(),
            self.deployer.clone(),
            self.inventory.clone(),
            self.loader.clone(),
        )
        .with_event_sink(self.events.clone())
    }
}

impl Default for DeployHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{parse_descriptor, DependencyExtractor};
    use std::path::Path;

    #[test]
    fn test_weather_yaml_matches_descriptor() {
        let parsed = parse_descriptor(WEATHER_AGENT_YAML, Path::new(WEATHER_AGENT_PATH)).unwrap();
        let extractor = DependencyExtractor::new();

        assert_eq!(
            extractor.extract(&parsed).unwrap(),
            extractor.extract(&weather_descriptor()).unwrap()
        );
    }

    #[test]
    fn test_harness_defaults() {
        let harness = DeployHarness::new();
        let orchestrator = harness.orchestrator();

        assert_eq!(orchestrator.catalog().len(), 3);
        assert_eq!(orchestrator.config().resource_group, "ad-usa-poc");
        assert!(harness.inventory.queries().is_empty());
    }

    #[tokio::test]
    async fn test_harness_inventory_holds_standard_guardrail() {
        use crate::core::ResourceKind;
        use crate::ports::ResourceInventory;

        let harness = DeployHarness::new();
        assert!(harness
            .inventory
            .exists(ResourceKind::Guardrail, DEFAULT_GUARDRAIL_POLICY)
            .await
            .unwrap());

        let empty = DeployHarness::new().with_inventory(InMemoryInventory::new());
        assert!(!empty
            .inventory
            .exists(ResourceKind::Guardrail, DEFAULT_GUARDRAIL_POLICY)
            .await
            .unwrap());
    }
}
