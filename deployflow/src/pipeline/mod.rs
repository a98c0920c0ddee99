//! Stage catalog construction and deployment planning.
//!
//! This module provides:
//! - Stage definitions
//! - Catalog builder with cycle detection
//! - The stage planner

mod builder;
mod catalog;
mod plan;
mod spec;

pub use builder::CatalogBuilder;
pub use catalog::{AGENTS_STAGE, CONNECTIONS_STAGE, GUARDRAILS_STAGE, StageCatalog};
pub use plan::{DeploymentPlan, PlannedStage, plan};
pub use spec::{ParameterSet, StageDefinition, TemplateRef};
