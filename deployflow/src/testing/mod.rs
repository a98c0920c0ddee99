//! Test utilities.
//!
//! In-memory implementations of the collaborator ports, a harness that
//! wires them to an [`Orchestrator`](crate::orchestrator::Orchestrator), and
//! report assertions.

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_blocked_on, assert_error_code, assert_stage_state, assert_states};
pub use fixtures::{standard_catalog, standard_guardrail, weather_descriptor, DeployHarness, WEATHER_AGENT_PATH, WEATHER_AGENT_YAML};
pub use mocks::{InMemoryInventory, RecordingDeployer, StaticDescriptorLoader};
