//! Deployment orchestration.
//!
//! Per stage:
//!
//! ```text
//! Pending -> Running -> Succeeded | Failed
//! Pending -> Skipped
//! Pending -> SkippedDependencyMissing
//! ```
//!
//! Stages are resolved strictly in plan order. A failed stage immediately
//! blocks every transitive dependent without consulting the validator.

mod outcome;
mod report;
mod request;
mod runner;


pub use outcome::{OutcomeTable, StageRecord};
pub use report::{DeploymentReport, ErrorDetail, StageReport};
pub use request::{CarriedOutcome, DeploymentRequest};
pub use runner::Orchestrator;
