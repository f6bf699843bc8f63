//! Registered routes and the route manifest they are loaded from.
//!
//! A manifest is a YAML or JSON list of route records:
//!
//! ```yaml
//! - methods: [GET, HEAD]
//!   uri: api/users/{user}
//!   name: users.show
//!   action: UserController@show
//! - methods: [GET]
//!   uri: api/health
//!   action: Closure
//! ```

use crate::error::Error;
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// HTTP method of a route or operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    /// Lower-case key used for the method inside a path item
    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
            Self::Head => "head",
            Self::Options => "options",
            Self::Trace => "trace",
        }
    }

    /// Whether input for this method travels in the query string
    pub fn reads_query(&self) -> bool {
        matches!(self, Self::Get | Self::Head | Self::Delete)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key().to_uppercase())
    }
}

impl TryFrom<&str> for HttpMethod {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "TRACE" => Ok(Self::Trace),
            other => Err(Error::InvalidRoute(format!("unknown HTTP method: {other}"))),
        }
    }
}

/// What a route dispatches to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerRef {
    /// An associated function of a type: `UserController@show`
    Method { class: String, method: String },
    /// A closure; it has no declared type to analyze
    Closure,
}

impl HandlerRef {
    /// Parses a `Type@method` or `Type::method` action string
    pub fn parse(action: &str) -> Result<Self, Error> {
        let action = action.trim();
        if action.is_empty() || action == "Closure" {
            return Ok(HandlerRef::Closure);
        }

        let split = action
            .rsplit_once('@')
            .or_else(|| action.rsplit_once("::"));

        match split {
            Some((class, method)) if !class.is_empty() && !method.is_empty() => {
                Ok(HandlerRef::Method {
                    class: class.to_string(),
                    method: method.to_string(),
                })
            }
            _ => Err(Error::InvalidRoute(format!("unrecognised action: {action}"))),
        }
    }

    /// The type name used for source lookups (last path segment)
    pub fn class_ident(&self) -> Option<&str> {
        match self {
            HandlerRef::Method { class, .. } => class.rsplit("::").next(),
            HandlerRef::Closure => None,
        }
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerRef::Method { class, method } => write!(f, "{}@{}", class, method),
            HandlerRef::Closure => f.write_str("Closure"),
        }
    }
}

/// A registered route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub methods: Vec<HttpMethod>,
    /// URI template without leading slash, e.g. `api/users/{user}`
    pub uri: String,
    pub domain: Option<String>,
    pub name: Option<String>,
    pub handler: HandlerRef,
}

impl Route {
    pub fn new(methods: Vec<HttpMethod>, uri: &str, handler: HandlerRef) -> Self {
        Self {
            methods,
            uri: uri.trim_start_matches('/').to_string(),
            domain: None,
            name: None,
            handler,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn on_domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }

    /// The method the route is documented under (the first declared one)
    pub fn method(&self) -> HttpMethod {
        self.methods.first().copied().unwrap_or_default()
    }

    pub fn is_class_based(&self) -> bool {
        matches!(self.handler, HandlerRef::Method { .. })
    }
}

/// Queryable list of registered routes
pub trait RouteSource {
    fn routes(&self) -> &[Route];
}

/// Route record as written in a manifest file
#[derive(Debug, Clone, Deserialize)]
struct RouteRecord {
    #[serde(default)]
    methods: Vec<String>,
    #[serde(default)]
    method: Option<String>,
    uri: String,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    action: Option<String>,
}

impl TryFrom<RouteRecord> for Route {
    type Error = Error;

    fn try_from(record: RouteRecord) -> Result<Self, Self::Error> {
        let mut methods = record
            .methods
            .iter()
            .chain(record.method.iter())
            .map(|m| HttpMethod::try_from(m.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        if methods.is_empty() {
            methods.push(HttpMethod::Get);
        }

        let handler = match record.action {
            Some(action) => HandlerRef::parse(&action)?,
            None => HandlerRef::Closure,
        };

        Ok(Route {
            methods,
            uri: record.uri.trim_start_matches('/').to_string(),
            domain: record.domain.filter(|d| !d.is_empty()),
            name: record.name,
            handler,
        })
    }
}

/// Route table snapshot, in registration order
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Loads a route manifest (`.json` as JSON, anything else as YAML)
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading route manifest from {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read route manifest: {}", path.display()))?;

        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let records: Vec<RouteRecord> = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON route manifest: {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML route manifest: {}", path.display()))?
        };

        let routes = records
            .into_iter()
            .map(Route::try_from)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Invalid route in manifest: {}", path.display()))?;

        debug!("Loaded {} routes", routes.len());
        Ok(Self { routes })
    }
}

impl RouteSource for RouteTable {
    fn routes(&self) -> &[Route] {
        &self.routes
    }
}
