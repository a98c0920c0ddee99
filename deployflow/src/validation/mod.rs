//! Stage validation.
//!
//! Before a stage is resolved the validator decides whether its dependencies
//! are actually satisfied, consulting the inventory for stages that were not
//! requested.

mod demand;
mod validator;

pub use demand::DescriptorDemand;
pub use validator::{StageValidator, ValidationResult};
