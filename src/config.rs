//! Configuration Management
//!
//! Persistent defaults for the `mistral` command. Command-line flags and
//! `OS_*` environment variables take precedence over these values.

use anyhow::{bail, Result};
use mistralclient::mistral::catalog::{DEFAULT_INTERFACE, DEFAULT_SERVICE_TYPE};
use mistralclient::mistral::client::DEFAULT_MISTRAL_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Keys accepted by `mistral config set`
pub const KEYS: &[&str] = &[
    "mistral_url",
    "auth_url",
    "auth_type",
    "project_name",
    "region_name",
    "service_type",
    "endpoint_type",
    "output_format",
];

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Mistral API endpoint
    #[serde(default)]
    pub mistral_url: Option<String>,
    /// Identity service endpoint
    #[serde(default)]
    pub auth_url: Option<String>,
    /// `keystone` or `keycloak-oidc`
    #[serde(default)]
    pub auth_type: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub region_name: Option<String>,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub endpoint_type: Option<String>,
    /// `json` or `yaml`
    #[serde(default)]
    pub output_format: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mistral").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit path; missing or unreadable files give defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective endpoint (CLI > env > config > catalog lookup)
    ///
    /// `None` lets authentication resolve the endpoint from the catalog.
    pub fn effective_mistral_url(&self, cli: Option<String>) -> Option<String> {
        cli.or_else(|| self.mistral_url.clone())
    }

    pub fn effective_auth_url(&self, cli: Option<String>) -> Option<String> {
        cli.or_else(|| self.auth_url.clone())
    }

    pub fn effective_auth_type(&self, cli: Option<String>) -> String {
        cli.or_else(|| self.auth_type.clone())
            .unwrap_or_else(|| "keystone".to_string())
    }

    pub fn effective_project_name(&self, cli: Option<String>) -> Option<String> {
        cli.or_else(|| self.project_name.clone())
    }

    pub fn effective_region_name(&self, cli: Option<String>) -> Option<String> {
        cli.or_else(|| self.region_name.clone())
    }

    pub fn effective_service_type(&self, cli: Option<String>) -> String {
        cli.or_else(|| self.service_type.clone())
            .unwrap_or_else(|| DEFAULT_SERVICE_TYPE.to_string())
    }

    pub fn effective_endpoint_type(&self, cli: Option<String>) -> String {
        cli.or_else(|| self.endpoint_type.clone())
            .unwrap_or_else(|| DEFAULT_INTERFACE.to_string())
    }

    pub fn effective_output_format(&self, cli: Option<String>) -> String {
        cli.or_else(|| self.output_format.clone())
            .unwrap_or_else(|| "json".to_string())
    }

    /// Endpoint shown by `config show` when nothing is configured
    pub fn display_mistral_url(&self) -> String {
        self.mistral_url
            .clone()
            .unwrap_or_else(|| DEFAULT_MISTRAL_URL.to_string())
    }

    /// Set one key; an empty value clears it
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let value = (!value.is_empty()).then(|| value.to_string());
        let slot = match key {
            "mistral_url" => &mut self.mistral_url,
            "auth_url" => &mut self.auth_url,
            "auth_type" => &mut self.auth_type,
            "project_name" => &mut self.project_name,
            "region_name" => &mut self.region_name,
            "service_type" => &mut self.service_type,
            "endpoint_type" => &mut self.endpoint_type,
            "output_format" => {
                if let Some(format) = value.as_deref() {
                    if format != "json" && format != "yaml" {
                        bail!("output_format must be 'json' or 'yaml', got '{}'", format);
                    }
                }
                &mut self.output_format
            }
            other => bail!("unknown config key '{}', expected one of: {}", other, KEYS.join(", ")),
        };
        *slot = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("mistral-config-{}", uuid::Uuid::new_v4()))
            .join("config.json")
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_from(&temp_path());
        assert_eq!(config, Config::default());
        assert_eq!(config.effective_service_type(None), "workflowv2");
        assert_eq!(config.effective_endpoint_type(None), "public");
        assert_eq!(config.effective_output_format(None), "json");
        assert_eq!(config.display_mistral_url(), "http://localhost:8989/v2");
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path();
        let mut config = Config::default();
        config.set_value("mistral_url", "http://mistral:8989/v2").unwrap();
        config.set_value("output_format", "yaml").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded, config);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_cli_wins_over_file() {
        let config = Config {
            region_name: Some("RegionOne".into()),
            ..Default::default()
        };
        assert_eq!(
            config.effective_region_name(Some("RegionTwo".into())).as_deref(),
            Some("RegionTwo")
        );
        assert_eq!(config.effective_region_name(None).as_deref(), Some("RegionOne"));
    }

    #[test]
    fn test_set_value_validation() {
        let mut config = Config::default();
        assert!(config.set_value("colour", "red").is_err());
        assert!(config.set_value("output_format", "xml").is_err());

        config.set_value("auth_type", "keycloak-oidc").unwrap();
        assert_eq!(config.effective_auth_type(None), "keycloak-oidc");
        config.set_value("auth_type", "").unwrap();
        assert_eq!(config.auth_type, None);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
