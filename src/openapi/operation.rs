use super::schema::Schema;
use super::server::Server;
use crate::route::HttpMethod;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// OpenAPI Operation object, the accumulator for one route's analysis.
///
/// `method` and `path` place the operation inside the document and are not
/// serialized with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(skip)]
    pub method: HttpMethod,
    #[serde(skip)]
    pub path: String,
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    #[serde(default)]
    pub responses: IndexMap<String, Response>,
    #[serde(skip_serializing_if = "is_false", default)]
    pub deprecated: bool,
    /// Alternate servers for this operation only
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub servers: Vec<Server>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Operation {
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            operation_id: None,
            summary: None,
            description: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            request_body: None,
            responses: IndexMap::new(),
            deprecated: false,
            servers: Vec::new(),
        }
    }

    /// Adds a parameter unless one with the same name and location exists
    pub fn add_parameter(&mut self, parameter: Parameter) -> bool {
        let exists = self
            .parameters
            .iter()
            .any(|p| p.name == parameter.name && p.location == parameter.location);
        if !exists {
            self.parameters.push(parameter);
        }
        !exists
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn set_servers(&mut self, servers: Vec<Server>) {
        self.servers = servers;
    }
}

/// Where a parameter is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub schema: Schema,
}

impl Parameter {
    pub fn new(name: &str, location: ParameterLocation, schema: Schema) -> Self {
        Self {
            name: name.to_string(),
            location,
            description: None,
            required: location == ParameterLocation::Path,
            schema,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    pub content: IndexMap<String, MediaType>,
}

impl RequestBody {
    pub fn json(schema: Schema) -> Self {
        let mut content = IndexMap::new();
        content.insert("application/json".to_string(), MediaType { schema });
        Self {
            description: None,
            required: true,
            content,
        }
    }

    pub fn json_schema(&self) -> Option<&Schema> {
        self.content.get("application/json").map(|m| &m.schema)
    }
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

impl Response {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            content: None,
        }
    }

    pub fn json(description: &str, schema: Schema) -> Self {
        let mut content = IndexMap::new();
        content.insert("application/json".to_string(), MediaType { schema });
        Self {
            description: description.to_string(),
            content: Some(content),
        }
    }
}
