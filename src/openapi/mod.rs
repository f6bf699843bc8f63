//! OpenAPI document model.
//!
//! The [`Document`] is built by a single writer during a generation run: the
//! generator adds servers, folds every analyzed [`Operation`] into its [`Path`] and
//! finally normalizes server overrides (see [`crate::merger`]). Paths and
//! operations keep insertion order, so output follows route registration order.

pub mod operation;
pub mod schema;
pub mod server;

pub use operation::{MediaType, Operation, Parameter, ParameterLocation, RequestBody, Response};
pub use schema::{Schema, SchemaType};
pub use server::{Server, ServerFactory, ServerVariable};

use crate::route::HttpMethod;
use indexmap::IndexMap;
use log::warn;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

pub const OPENAPI_VERSION: &str = "3.1.0";

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub schemas: IndexMap<String, Schema>,
}

impl Components {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// All operations sharing one path template.
///
/// When `servers` is non-empty it overrides the document servers for every
/// operation, and the operations themselves carry no servers.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Template without leading or trailing slashes, e.g. `users/{user}`
    pub path: String,
    pub operations: IndexMap<HttpMethod, Operation>,
    pub servers: Vec<Server>,
}

impl Path {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            operations: IndexMap::new(),
            servers: Vec::new(),
        }
    }

    /// Adds an operation under its method. The first operation registered for a
    /// method is kept; later ones are dropped with a warning.
    pub fn add_operation(&mut self, operation: Operation) -> &mut Self {
        let method = operation.method;
        if self.operations.contains_key(&method) {
            warn!(
                "Duplicate {} operation for path '{}', keeping the first one",
                method, self.path
            );
        } else {
            self.operations.insert(method, operation);
        }
        self
    }

    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        self.operations.get(&method)
    }

    pub fn set_servers(&mut self, servers: Vec<Server>) {
        self.servers = servers;
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.operations.len() + usize::from(!self.servers.is_empty());
        let mut map = serializer.serialize_map(Some(len))?;
        if !self.servers.is_empty() {
            map.serialize_entry("servers", &self.servers)?;
        }
        for (method, operation) in &self.operations {
            map.serialize_entry(method.as_key(), operation)?;
        }
        map.end()
    }
}

/// Root of the generated API description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub openapi: String,
    pub info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    #[serde(serialize_with = "serialize_paths")]
    pub paths: IndexMap<String, Path>,
    #[serde(skip_serializing_if = "IndexMap::is_empty", serialize_with = "serialize_paths")]
    pub webhooks: IndexMap<String, Path>,
    #[serde(skip_serializing_if = "Components::is_empty")]
    pub components: Components,
}

fn serialize_paths<S: Serializer>(paths: &IndexMap<String, Path>, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(paths.len()))?;
    for (key, path) in paths {
        map.serialize_entry(&format!("/{}", key), path)?;
    }
    map.end()
}

impl Document {
    pub fn new(info: Info) -> Self {
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info,
            servers: Vec::new(),
            paths: IndexMap::new(),
            webhooks: IndexMap::new(),
            components: Components::default(),
        }
    }

    pub fn add_server(&mut self, server: Server) -> &mut Self {
        self.servers.push(server);
        self
    }

    /// Folds an operation into the path at `key`, creating the path if needed
    pub fn add_operation(&mut self, key: &str, operation: Operation) {
        fold(&mut self.paths, key, operation);
    }

    /// Same as [`Document::add_operation`] for the webhook collection
    pub fn add_webhook_operation(&mut self, key: &str, operation: Operation) {
        fold(&mut self.webhooks, key, operation);
    }

    pub fn path(&self, key: &str) -> Option<&Path> {
        self.paths.get(key)
    }

    /// Every operation of the regular paths, in document order
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.paths.values().flat_map(|p| p.operations.values())
    }

    /// The nested mapping handed to renderers
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

fn fold(paths: &mut IndexMap<String, Path>, key: &str, operation: Operation) {
    paths
        .entry(key.to_string())
        .or_insert_with(|| Path::new(key))
        .add_operation(operation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn info() -> Info {
        Info {
            title: "Shop".to_string(),
            version: "1.0.0".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_fold_groups_operations_by_path() {
        let mut document = Document::new(info());
        document.add_operation("users", Operation::new(HttpMethod::Get, "api/users"));
        document.add_operation("users", Operation::new(HttpMethod::Post, "api/users"));
        document.add_operation("users/{user}", Operation::new(HttpMethod::Get, "api/users/{user}"));

        assert_eq!(document.paths.len(), 2);
        let users = document.path("users").unwrap();
        assert!(users.operation(HttpMethod::Get).is_some());
        assert!(users.operation(HttpMethod::Post).is_some());
        assert_eq!(document.operations().count(), 3);
    }

    #[test]
    fn test_duplicate_method_keeps_first_operation() {
        let mut path = Path::new("users");
        let mut first = Operation::new(HttpMethod::Get, "api/users");
        first.operation_id = Some("first".to_string());
        let mut second = Operation::new(HttpMethod::Get, "api/users");
        second.operation_id = Some("second".to_string());

        path.add_operation(first).add_operation(second);
        assert_eq!(path.operations.len(), 1);
        assert_eq!(
            path.operation(HttpMethod::Get).unwrap().operation_id.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn test_document_serialization() {
        let mut document = Document::new(info());
        document.add_server(Server::new("http://localhost/api"));

        let mut operation = Operation::new(HttpMethod::Get, "api/users");
        operation.responses.insert("200".to_string(), Response::new("OK"));
        document.add_operation("users", operation.clone());
        document.paths["users"].set_servers(vec![Server::new("https://eu.example.com")]);

        assert_eq!(
            document.to_value().unwrap(),
            json!({
                "openapi": "3.1.0",
                "info": {"title": "Shop", "version": "1.0.0"},
                "servers": [{"url": "http://localhost/api"}],
                "paths": {
                    "/users": {
                        "servers": [{"url": "https://eu.example.com"}],
                        "get": {"responses": {"200": {"description": "OK"}}}
                    }
                }
            })
        );

        document.add_webhook_operation("order-paid", Operation::new(HttpMethod::Post, "webhooks/order-paid"));
        document.components.schemas.insert("User".to_string(), Schema::object());
        let value = document.to_value().unwrap();
        assert!(value["webhooks"]["/order-paid"]["post"].is_object());
        assert_eq!(value["components"]["schemas"]["User"], json!({"type": "object"}));
    }
}
