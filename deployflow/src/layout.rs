//! Infrastructure layout verification.
//!
//! Checks that every template and parameter file a catalog references exists
//! on disk before anything is deployed.

use crate::core::StageId;
use crate::pipeline::StageCatalog;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// What a referenced file is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    /// A deployment template.
    Template,
    /// A parameter file.
    Parameters,
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template => write!(f, "template"),
            Self::Parameters => write!(f, "parameters"),
        }
    }
}

/// A referenced file that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingArtifact {
    /// The stage referencing the file.
    pub stage: StageId,
    /// What the file is for.
    pub role: ArtifactRole,
    /// The missing path.
    pub path: PathBuf,
}

/// Result of a layout check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayoutReport {
    /// Number of files checked.
    pub checked: usize,
    /// Files that are missing.
    pub missing: Vec<MissingArtifact>,
}

impl LayoutReport {
    /// Returns true if every referenced file exists.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Checks every template and parameter file referenced by `catalog`.
#[must_use]
pub fn verify_layout(catalog: &StageCatalog) -> LayoutReport {
    let mut report = LayoutReport::default();

    for stage in catalog.stages() {
        let referenced = [
            (ArtifactRole::Template, stage.template.path()),
            (ArtifactRole::Parameters, stage.parameters.file.as_ref()),
        ];

        for (role, path) in referenced {
            let Some(path) = path else { continue };
            report.checked += 1;
            if !path.exists() {
                warn!(stage = %stage.id, %role, path = %path.display(), "Referenced file missing");
                report.missing.push(MissingArtifact {
                    stage: stage.id.clone(),
                    role,
                    path: path.clone(),
                });
            }
        }
    }

    info!(checked = report.checked, missing = report.missing.len(), "Layout verified");
    report
}
