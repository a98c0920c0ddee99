//! Deployment configuration.
//!
//! Values come from defaults, a JSON file, or the process environment:
//!
//! | variable | field |
//! |---|---|
//! | `DEPLOY_ENVIRONMENT` | `environment` |
//! | `AZURE_RESOURCE_GROUP` | `resource_group` |
//! | `FOUNDRY_ENDPOINT` | `foundry_endpoint` |
//! | `AGENT_YAML_PATH` | `default_agent_descriptor` |
//! | `GUARDRAIL_POLICY` | `guardrail_policy` |
//! | `DEPLOY_LOG_FORMAT` | `log_format` |

use crate::errors::DeployflowError;
use crate::observability::LogFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Target environment of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Non-production.
    #[default]
    Nonprod,
    /// Production.
    Prod,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nonprod => write!(f, "nonprod"),
            Self::Prod => write!(f, "prod"),
        }
    }
}

impl FromStr for Environment {
    type Err = DeployflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "nonprod" => Ok(Self::Nonprod),
            "prod" => Ok(Self::Prod),
            other => Err(DeployflowError::Configuration(format!(
                "environment must be 'nonprod' or 'prod', got '{other}'"
            ))),
        }
    }
}

fn default_resource_group() -> String {
    "ad-usa-poc".to_string()
}

fn default_infrastructure_root() -> PathBuf {
    PathBuf::from("infrastructure")
}

fn default_guardrail_policy() -> String {
    DEFAULT_GUARDRAIL_POLICY.to_string()
}

/// Name of the content filter the guardrails parameters deploy.
pub const DEFAULT_GUARDRAIL_POLICY: &str = "content-filter";

/// Configuration shared by every stage of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Target environment.
    #[serde(default)]
    pub environment: Environment,
    /// Resource group every template is applied to.
    #[serde(default = "default_resource_group")]
    pub resource_group: String,
    /// Agent service endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foundry_endpoint: Option<String>,
    /// Directory holding the `modules/` and `parameters/` trees.
    #[serde(default = "default_infrastructure_root")]
    pub infrastructure_root: PathBuf,
    /// Descriptor used for the agents stage when a request attaches none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_agent_descriptor: Option<PathBuf>,
    /// Content filter the guardrails stage always provides.
    #[serde(default = "default_guardrail_policy")]
    pub guardrail_policy: String,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            resource_group: default_resource_group(),
            foundry_endpoint: None,
            infrastructure_root: default_infrastructure_root(),
            default_agent_descriptor: None,
            guardrail_policy: default_guardrail_policy(),
            log_format: LogFormat::default(),
        }
    }
}

impl DeployConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the environment.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Sets the resource group.
    #[must_use]
    pub fn with_resource_group(mut self, resource_group: impl Into<String>) -> Self {
        self.resource_group = resource_group.into();
        self
    }

    /// Sets the agent service endpoint.
    #[must_use]
    pub fn with_foundry_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.foundry_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the infrastructure root.
    #[must_use]
    pub fn with_infrastructure_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.infrastructure_root = root.into();
        self
    }

    /// Sets the default agent descriptor.
    #[must_use]
    pub fn with_default_agent_descriptor(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_agent_descriptor = Some(path.into());
        self
    }

    /// Sets the guardrail policy name.
    #[must_use]
    pub fn with_guardrail_policy(mut self, policy: impl Into<String>) -> Self {
        self.guardrail_policy = policy.into();
        self
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`DeployflowError::Configuration`] for an invalid environment
    /// name or log format.
    pub fn from_env() -> Result<Self, DeployflowError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through a variable lookup.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`DeployflowError::Configuration`] for an invalid environment
    /// name or log format.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DeployflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(env) = get("DEPLOY_ENVIRONMENT") {
            config.environment = env.parse()?;
        }
        if let Some(group) = get("AZURE_RESOURCE_GROUP") {
            config.resource_group = group;
        }
        config.foundry_endpoint = get("FOUNDRY_ENDPOINT");
        config.default_agent_descriptor = get("AGENT_YAML_PATH").map(PathBuf::from);
        if let Some(policy) = get("GUARDRAIL_POLICY") {
            config.guardrail_policy = policy;
        }
        if let Some(format) = get("DEPLOY_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }

        Ok(config)
    }

    /// Loads the configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`DeployflowError::Configuration`] if the file cannot be read or
    /// parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DeployflowError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DeployflowError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            DeployflowError::Configuration(format!("invalid config {}: {e}", path.display()))
        })
    }

    /// Returns the deployment name of a stage, `{stage}-{environment}`.
    #[must_use]
    pub fn deployment_name(&self, stage: &str) -> String {
        format!("{stage}-{}", self.environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DeployConfig::default();

        assert_eq!(config.environment, Environment::Nonprod);
        assert_eq!(config.resource_group, "ad-usa-poc");
        assert_eq!(config.infrastructure_root, PathBuf::from("infrastructure"));
        assert_eq!(config.guardrail_policy, DEFAULT_GUARDRAIL_POLICY);
        assert_eq!(config.deployment_name("guardrails"), "guardrails-nonprod");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DEPLOY_ENVIRONMENT", "prod"),
            ("AZURE_RESOURCE_GROUP", "rg-agents"),
            ("FOUNDRY_ENDPOINT", "https://acct.services.ai.azure.com/api/projects/p"),
            ("AGENT_YAML_PATH", "agents/weather.yaml"),
            ("GUARDRAIL_POLICY", "strict-filter"),
            ("DEPLOY_LOG_FORMAT", ""),
        ]);

        let config = DeployConfig::from_lookup(|k| vars.get(k).map(ToString::to_string)).unwrap();

        assert_eq!(config.environment, Environment::Prod);
        assert_eq!(config.resource_group, "rg-agents");
        assert_eq!(config.default_agent_descriptor, Some(PathBuf::from("agents/weather.yaml")));
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.guardrail_policy, "strict-filter");
        assert_eq!(config.deployment_name("connections"), "connections-prod");
    }

    #[test]
    fn test_invalid_environment() {
        let err = DeployConfig::from_lookup(|k| (k == "DEPLOY_ENVIRONMENT").then(|| "staging".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("'staging'"));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.json");
        std::fs::write(&path, r#"{"environment": "prod", "log_format": "json"}"#).unwrap();

        let config = DeployConfig::from_json_file(&path).unwrap();
        assert_eq!(config.environment, Environment::Prod);
        assert_eq!(config.resource_group, "ad-usa-poc");
        assert_eq!(config.log_format, LogFormat::Json);

        assert!(DeployConfig::from_json_file(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_config_builders() {
        let config = DeployConfig::new()
            .with_environment(Environment::Prod)
            .with_resource_group("rg")
            .with_foundry_endpoint("https://endpoint")
            .with_infrastructure_root("/srv/infra")
            .with_default_agent_descriptor("agent.yaml");

        assert_eq!(config.foundry_endpoint.as_deref(), Some("https://endpoint"));
        assert_eq!(config.infrastructure_root, PathBuf::from("/srv/infra"));
    }
}
