//! Loading agent descriptors from YAML.

use super::Descriptor;
use crate::errors::ParseError;
use crate::ports::DescriptorLoader;
use serde_yaml::Value as YamlValue;
use std::path::{Path, PathBuf};

/// Parses a YAML agent descriptor.
///
/// `name` and `model.id` are required, and `model` must be a mapping.
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first problem found.
pub fn parse_descriptor(raw: &str, path: &Path) -> Result<Descriptor, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty {
            path: path.to_path_buf(),
        });
    }

    let value: YamlValue = serde_yaml::from_str(raw).map_err(|e| ParseError::Syntax {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    match &value {
        YamlValue::Null => {
            return Err(ParseError::Empty {
                path: path.to_path_buf(),
            });
        }
        YamlValue::Mapping(_) => {}
        _ => {
            return Err(ParseError::Syntax {
                path: path.to_path_buf(),
                message: "top level must be a mapping".to_string(),
            });
        }
    }

    for field in ["name", "model"] {
        if value.get(field).is_none() {
            return Err(ParseError::MissingField {
                path: path.to_path_buf(),
                field: field.to_string(),
            });
        }
    }

    match value.get("model") {
        Some(model @ YamlValue::Mapping(_)) => {
            if model.get("id").is_none() {
                return Err(ParseError::MissingField {
                    path: path.to_path_buf(),
                    field: "model.id".to_string(),
                });
            }
        }
        _ => {
            return Err(ParseError::InvalidField {
                path: path.to_path_buf(),
                field: "model".to_string(),
                message: "must be a mapping with an 'id' field".to_string(),
            });
        }
    }

    let mut descriptor: Descriptor = serde_yaml::from_value(value).map_err(|e| ParseError::Syntax {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    descriptor.source = Some(path.to_path_buf());

    Ok(descriptor)
}

/// Loads descriptors from YAML files on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDescriptorLoader;

impl YamlDescriptorLoader {
    /// Creates a new loader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl DescriptorLoader for YamlDescriptorLoader {
    fn load(&self, path: &Path) -> Result<Descriptor, ParseError> {
        if !path.exists() {
            return Err(ParseError::NotFound {
                path: PathBuf::from(path),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|e| ParseError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), "Loaded agent descriptor");
        parse_descriptor(&raw, path)
    }
}
