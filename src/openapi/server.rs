use crate::config::ServerVariableConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// OpenAPI Server object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub variables: IndexMap<String, ServerVariable>,
}

/// OpenAPI Server Variable object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerVariable {
    pub default: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty", default)]
    pub enum_values: Vec<String>,
}

impl Server {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            description: None,
            variables: IndexMap::new(),
        }
    }
}

/// Builds servers, turning `{name}` url placeholders into server variables
#[derive(Debug, Clone, Default)]
pub struct ServerFactory {
    variables: IndexMap<String, ServerVariableConfig>,
}

impl ServerFactory {
    pub fn new(variables: IndexMap<String, ServerVariableConfig>) -> Self {
        Self { variables }
    }

    /// An empty description is treated as none
    pub fn make(&self, url: &str, description: &str) -> Server {
        let mut server = Server::new(url);
        server.description = (!description.is_empty()).then(|| description.to_string());

        for name in placeholders(url) {
            let variable = match self.variables.get(name) {
                Some(config) => ServerVariable {
                    default: if config.default.is_empty() {
                        name.to_string()
                    } else {
                        config.default.clone()
                    },
                    description: config.description.clone(),
                    enum_values: config.enum_values.clone(),
                },
                None => ServerVariable {
                    default: name.to_string(),
                    description: None,
                    enum_values: Vec::new(),
                },
            };
            server.variables.insert(name.to_string(), variable);
        }

        server
    }
}

/// `{name}` placeholders in order of appearance
fn placeholders(url: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = url;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = &after[..end];
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
        rest = &after[end + 1..];
    }
    names
}
