//! # Deployflow
//!
//! A dependency-validated, multi-stage deployment orchestrator for layered
//! cloud resources.
//!
//! Deployflow deploys an ordered set of stages (guardrails, connections,
//! agents) where each layer needs the previous one to exist:
//!
//! - **Selective runs**: request any subset of stages; the rest are skipped
//! - **Dependency validation**: skipped stages are checked against a live
//!   resource inventory before anything that needs them is deployed
//! - **Descriptor awareness**: agent descriptors are scanned for the
//!   connections and guardrails their tools reference
//! - **Failure propagation**: a failed stage blocks its dependents without
//!   ever invoking the deployer for them
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deployflow::prelude::*;
//!
//! let config = DeployConfig::from_env()?;
//! let catalog = Arc::new(StageCatalog::standard(&config)?);
//! let orchestrator = Orchestrator::new(catalog, config, deployer, inventory, loader);
//!
//! let request = DeploymentRequest::new(["agents"])
//!     .with_descriptor("agents", "agents/weather.yaml");
//! let report = orchestrator.run(&request).await?;
//! std::process::exit(report.exit_code());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod descriptor;
pub mod errors;
pub mod events;
pub mod inventory;
pub mod layout;
pub mod observability;
pub mod orchestrator;
pub mod pipeline;
pub mod ports;
pub mod testing;
pub mod validation;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{DeployConfig, Environment};
    pub use crate::core::{
        ResourceHandle, ResourceKind, ResourceReference, StageAction, StageId, StageState,
    };
    pub use crate::descriptor::{DependencyExtractor, Descriptor, ToolEntry, YamlDescriptorLoader};
    pub use crate::errors::{
        ContractErrorInfo, DeployError, DeployflowError, InventoryError, ParseError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::orchestrator::{DeploymentReport, DeploymentRequest, Orchestrator, StageReport};
    pub use crate::pipeline::{plan, DeploymentPlan, StageCatalog, StageDefinition};
    pub use crate::ports::{DeployRequest, DescriptorLoader, ResourceDeployer, ResourceInventory};
    pub use std::sync::Arc;
}
