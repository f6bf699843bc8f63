//! Generator configuration.
//!
//! Every key is optional; a missing configuration file behaves like an empty one.
//! Files ending in `.json` are read as JSON, everything else as YAML.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Read-only configuration surface of one generation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Route prefix of the documented API (e.g. `api`)
    pub api_path: String,
    /// Route prefix of webhook routes
    pub webhook_path: String,
    /// Domain API routes are expected to be registered on
    pub api_domain: Option<String>,
    /// Explicit server list (description -> url); derived from `api_domain` when absent
    pub servers: Option<IndexMap<String, String>>,
    /// Defaults for `{name}` placeholders in server urls
    pub server_variables: IndexMap<String, ServerVariableConfig>,
    /// Base url of the running application, used to resolve relative urls
    pub app_url: String,
    /// Info block of the document
    pub info: InfoConfig,
    /// Log route analysis failures with their source location
    pub debug: bool,
}

/// Info block settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoConfig {
    pub title: String,
    pub version: String,
    pub description: String,
}

/// Default and allowed values of one server url variable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerVariableConfig {
    pub default: String,
    pub description: Option<String>,
    #[serde(rename = "enum")]
    pub enum_values: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_path: "api".to_string(),
            webhook_path: "webhooks".to_string(),
            api_domain: None,
            servers: None,
            server_variables: IndexMap::new(),
            app_url: "http://localhost".to_string(),
            info: InfoConfig::default(),
            debug: false,
        }
    }
}

impl Default for InfoConfig {
    fn default() -> Self {
        Self {
            title: "API".to_string(),
            version: "0.0.1".to_string(),
            description: String::new(),
        }
    }
}

impl Config {
    /// Loads the configuration from a YAML or JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let config = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON configuration: {}", path.display()))?
        } else if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML configuration: {}", path.display()))?
        };

        Ok(config)
    }

    /// Protocol of the current request context (`http`, `https`)
    pub fn protocol(&self) -> &str {
        self.app_url.split("://").next().unwrap_or("http")
    }

    /// Resolves `path` against the application url; absolute urls pass through
    pub fn url(&self, path: &str) -> String {
        if path.contains("://") {
            return path.trim_end_matches('/').to_string();
        }

        let base = self.app_url.trim_end_matches('/');
        let path = path.trim_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }
}
