//! Configuration Management
//!
//! Clouds are read from `<config dir>/ostack/clouds.yaml`:
//!
//! ```yaml
//! default_cloud: prod
//! clouds:
//!   prod:
//!     token: gAAAA...
//!     project_id: 8f2c...
//!     endpoints:
//!       compute: https://nova.example.com/v2.1
//!       image: https://glance.example.com
//!       network: https://neutron.example.com
//!       baremetal: https://ironic.example.com
//!       volumev3: https://cinder.example.com/v3/8f2c...
//!       identity: https://keystone.example.com
//! ```
//!
//! `OS_*` environment variables override the selected cloud.

use crate::error::{OstackError, Result};
use crate::provider::{Context, Service};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Contents of clouds.yaml
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Cloud used when neither `--cloud` nor `OS_CLOUD` is given
    #[serde(default)]
    pub default_cloud: Option<String>,
    #[serde(default)]
    pub clouds: BTreeMap<String, CloudConfig>,
}

/// One cloud: token, identity and service endpoints
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct CloudConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    /// Service type -> endpoint URL
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ostack").join("clouds.yaml"))
    }

    /// Load configuration from disk; a missing file is an empty configuration
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| OstackError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| OstackError::Config(e.to_string()))
    }

    /// Pick a cloud (requested > default_cloud > the only one configured)
    pub fn select_cloud(&self, requested: Option<&str>) -> Result<CloudConfig> {
        if let Some(name) = requested.or(self.default_cloud.as_deref()) {
            return self.clouds.get(name).cloned().ok_or_else(|| {
                OstackError::Config(format!(
                    "Unknown cloud '{}'. Configured clouds: {}",
                    name,
                    self.cloud_names().join(", ")
                ))
            });
        }

        match self.clouds.len() {
            0 => Ok(CloudConfig::default()),
            1 => Ok(self.clouds.values().next().cloned().unwrap_or_default()),
            _ => Err(OstackError::Config(format!(
                "Several clouds configured ({}); choose one with --cloud or OS_CLOUD",
                self.cloud_names().join(", ")
            ))),
        }
    }

    fn cloud_names(&self) -> Vec<String> {
        self.clouds.keys().cloned().collect()
    }
}

impl CloudConfig {
    /// Apply `OS_*` overrides, reading variables through `env`
    pub fn with_env_overrides(mut self, env: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = env("OS_TOKEN") {
            self.token = Some(token);
        }
        if let Some(user_id) = env("OS_USER_ID") {
            self.user_id = Some(user_id);
        }
        if let Some(project_id) = env("OS_PROJECT_ID") {
            self.project_id = Some(project_id);
        }
        for service in Service::ALL {
            if let Some(url) = env(&service.endpoint_env_var()) {
                self.endpoints.insert(service.as_str().to_string(), url);
            }
        }
        self
    }

    /// Identity known from configuration alone
    pub fn context(&self) -> Context {
        Context::new(self.user_id.clone(), self.project_id.clone())
    }
}

/// Read a non-empty environment variable
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const CLOUDS: &str = r#"
default_cloud: prod
clouds:
  prod:
    token: prod-token
    project_id: p1
    endpoints:
      compute: https://nova.prod.example.com/v2.1
  lab:
    token: lab-token
"#;

    #[test]
    fn test_parse_clouds_yaml() {
        let config = Config::from_yaml(CLOUDS).unwrap();
        assert_eq!(config.default_cloud.as_deref(), Some("prod"));
        assert_eq!(config.clouds.len(), 2);
        assert_eq!(
            config.clouds["prod"].endpoints["compute"],
            "https://nova.prod.example.com/v2.1"
        );
    }

    #[test]
    fn test_select_cloud_precedence() {
        let config = Config::from_yaml(CLOUDS).unwrap();

        let cloud = config.select_cloud(None).unwrap();
        assert_eq!(cloud.token.as_deref(), Some("prod-token"));

        let cloud = config.select_cloud(Some("lab")).unwrap();
        assert_eq!(cloud.token.as_deref(), Some("lab-token"));

        let err = config.select_cloud(Some("staging")).unwrap_err();
        assert!(err.to_string().contains("lab, prod"));
    }

    #[test]
    fn test_select_sole_or_no_cloud() {
        let config = Config::from_yaml("clouds:\n  only:\n    token: t\n").unwrap();
        assert_eq!(config.select_cloud(None).unwrap().token.as_deref(), Some("t"));

        assert_eq!(Config::default().select_cloud(None).unwrap(), CloudConfig::default());
    }

    #[test]
    fn test_select_ambiguous_cloud_fails() {
        let config = Config::from_yaml("clouds:\n  a: {}\n  b: {}\n").unwrap();
        assert!(config.select_cloud(None).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OS_TOKEN", "env-token"),
            ("OS_USER_ID", "u9"),
            ("OS_NETWORK_ENDPOINT", "https://neutron.example.com"),
        ]);
        let cloud = Config::from_yaml(CLOUDS)
            .unwrap()
            .select_cloud(None)
            .unwrap()
            .with_env_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(cloud.token.as_deref(), Some("env-token"));
        assert_eq!(
            cloud.context(),
            Context::new(Some("u9".to_string()), Some("p1".to_string()))
        );
        assert_eq!(cloud.endpoints["network"], "https://neutron.example.com");
        assert_eq!(cloud.endpoints.len(), 2);
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        let err = Config::from_yaml("clouds: [").unwrap_err();
        assert!(matches!(err, OstackError::Config(_)));
    }
}
