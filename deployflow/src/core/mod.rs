//! Core domain model types for deployflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage identifiers
//! - Stage action and state enums
//! - Resource references and handles

mod resource;
mod stage_id;
mod status;

pub use resource::{ResourceHandle, ResourceKind, ResourceReference};
pub use stage_id::StageId;
pub use status::{StageAction, StageState};
