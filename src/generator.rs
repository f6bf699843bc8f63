//! Generation entry point.
//!
//! One [`Generator::generate`] call is one batch run: the parse cache is
//! dropped, the source tree re-indexed, and every discovered route analyzed in
//! registration order.

use crate::catalog::{RouteCatalog, RouteResolver};
use crate::config::Config;
use crate::error::Error;
use crate::extensions::{ExtensionContext, OperationBuilder};
use crate::merger::move_same_alternative_servers_to_path;
use crate::openapi::{Document, Info, Operation, ServerFactory};
use crate::parser::FileParser;
use crate::route::{Route, RouteSource};
use crate::rules::RequestRegistry;
use crate::source_index::SourceIndex;
use anyhow::Result;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::rc::Rc;

/// Callback adjusting the finished document before servers are merged
pub type DocumentExtender = Rc<dyn Fn(&mut Document)>;

/// What to do when the analysis of one route fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Fail the whole run with the route's error
    #[default]
    Abort,
    /// Log the error and leave the route out of the document
    Skip,
}

/// Caller-provided hooks of a generation run
#[derive(Clone, Default)]
pub struct GeneratorOptions {
    /// Replaces the default route-acceptance predicate
    pub route_resolver: Option<RouteResolver>,
    pub document_extender: Option<DocumentExtender>,
    pub failure_policy: FailurePolicy,
}

/// Builds the API document of a route table and the sources of its handlers.
///
/// The generator owns the parse cache for its source roots, the request types
/// that may be instantiated, and the operation pipeline. A value can be reused
/// across runs; each [`Generator::generate`] call starts from fresh sources.
///
/// # Example
///
/// ```no_run
/// use scramble::config::Config;
/// use scramble::generator::{FailurePolicy, Generator, GeneratorOptions};
/// use scramble::route::RouteTable;
/// use std::path::{Path, PathBuf};
///
/// let routes = RouteTable::from_file(Path::new("routes.yaml")).unwrap();
/// let generator = Generator::new(Config::default(), Box::new(routes), vec![PathBuf::from("src")])
///     .with_options(GeneratorOptions {
///         failure_policy: FailurePolicy::Skip,
///         ..GeneratorOptions::default()
///     });
///
/// let document = generator.generate().unwrap();
/// println!("Documented {} paths", document.paths.len());
/// ```
pub struct Generator {
    config: Config,
    routes: Box<dyn RouteSource>,
    source_roots: Vec<PathBuf>,
    parser: FileParser,
    registry: RequestRegistry,
    builder: OperationBuilder,
    options: GeneratorOptions,
}

impl Generator {
    /// Creates a generator with the default pipeline and options.
    ///
    /// # Arguments
    ///
    /// * `config` - Paths, domain, servers and info of the document
    /// * `routes` - Registered routes
    /// * `source_roots` - Directories searched for handler and model sources
    pub fn new(config: Config, routes: Box<dyn RouteSource>, source_roots: Vec<PathBuf>) -> Self {
        Self {
            config,
            routes,
            source_roots,
            parser: FileParser::new(),
            registry: RequestRegistry::new(),
            builder: OperationBuilder::default(),
            options: GeneratorOptions::default(),
        }
    }

    /// Sets the resolver, document extender and failure policy
    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the request types instantiated for rule extraction
    pub fn with_registry(mut self, registry: RequestRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the operation pipeline
    pub fn with_builder(mut self, builder: OperationBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the generation.
    ///
    /// Steps, in order:
    /// 1. Drop cached syntax trees and index the source roots
    /// 2. Create the document and its servers
    /// 3. Build operations for the API routes and fold them into paths
    /// 4. Same for the webhook routes, into webhooks
    /// 5. Call the document extender, then merge shared alternate servers
    ///
    /// # Returns
    ///
    /// The complete document.
    ///
    /// # Errors
    ///
    /// Fails when the source roots cannot be scanned, or with
    /// [`Error::RouteAnalysis`] for the first failing route under
    /// [`FailurePolicy::Abort`]. No partial document is returned.
    pub fn generate(&self) -> Result<Document> {
        // Fresh sources for every run
        self.parser.clear();
        let index = SourceIndex::build(&self.parser, &self.source_roots)?;
        let servers = ServerFactory::new(self.config.server_variables.clone());
        let context = ExtensionContext {
            config: &self.config,
            parser: &self.parser,
            index: &index,
            registry: &self.registry,
            servers: &servers,
        };

        let mut document = self.make_document(&servers);
        let catalog = RouteCatalog::new(self.routes.as_ref(), &self.config, &self.parser, &index)
            .with_resolver(self.options.route_resolver.clone());

        // API routes
        let api_path = self.config.api_path.trim_matches('/');
        let routes = catalog.discover(api_path);
        info!("Analyzing {} API routes", routes.len());
        for operation in self.routes_to_operations(&routes, &mut document, &context)? {
            let key = path_key(&operation.path, api_path);
            document.add_operation(&key, operation);
        }

        // Webhook routes
        let webhook_path = self.config.webhook_path.trim_matches('/');
        if !webhook_path.is_empty() {
            let routes = catalog.discover(webhook_path);
            debug!("Analyzing {} webhook routes", routes.len());
            for operation in self.routes_to_operations(&routes, &mut document, &context)? {
                let key = path_key(&operation.path, webhook_path);
                document.add_webhook_operation(&key, operation);
            }
        }

        if let Some(extend) = &self.options.document_extender {
            extend(&mut document);
        }
        move_same_alternative_servers_to_path(&mut document);

        info!(
            "Documented {} paths and {} webhooks",
            document.paths.len(),
            document.webhooks.len()
        );
        Ok(document)
    }

    fn make_document(&self, servers: &ServerFactory) -> Document {
        let info = &self.config.info;
        let mut document = Document::new(Info {
            title: info.title.clone(),
            version: info.version.clone(),
            description: (!info.description.is_empty()).then(|| info.description.clone()),
        });

        match self.config.servers.as_ref().filter(|s| !s.is_empty()) {
            Some(configured) => {
                for (description, url) in configured {
                    let url = if url.is_empty() { "/" } else { url.as_str() };
                    document.add_server(servers.make(&self.config.url(url), description));
                }
            }
            None => {
                let domain = match self.config.api_domain.as_deref() {
                    Some(domain) if !domain.is_empty() && !domain.contains("://") => {
                        format!("{}://{}", self.config.protocol(), domain)
                    }
                    Some(domain) => domain.to_string(),
                    None => String::new(),
                };
                let url = format!("{}/{}", domain, self.config.api_path.trim_matches('/'));
                document.add_server(servers.make(&self.config.url(&url), ""));
            }
        }

        document
    }

    fn routes_to_operations(
        &self,
        routes: &[Route],
        document: &mut Document,
        context: &ExtensionContext<'_>,
    ) -> Result<Vec<Operation>> {
        let mut operations = Vec::new();

        for route in routes {
            match self.builder.build(route, document, context) {
                Ok(Some(operation)) => operations.push(operation),
                Ok(None) => {}
                Err(source) => {
                    let err = Error::RouteAnalysis {
                        method: route.method().to_string(),
                        uri: route.uri.clone(),
                        action: route.handler.to_string(),
                        source,
                    };
                    if self.config.debug {
                        error!(
                            "{} at {}",
                            err,
                            err.location().unwrap_or_else(|| "unknown location".to_string())
                        );
                    }
                    match self.options.failure_policy {
                        FailurePolicy::Abort => return Err(err.into()),
                        FailurePolicy::Skip => warn!("Skipping route: {:#}", anyhow::Error::from(err)),
                    }
                }
            }
        }

        Ok(operations)
    }
}

/// Path key of an operation.
///
/// The route-group prefix is stripped when it ends at a segment boundary, then
/// slashes are trimmed.
///
/// # Arguments
///
/// * `path` - Operation path, e.g. `api/users/{user}`
/// * `prefix` - Route-group prefix, e.g. `api`
///
/// # Example
///
/// ```
/// use scramble::generator::path_key;
///
/// assert_eq!(path_key("api/users/{user}", "api"), "users/{user}");
/// assert_eq!(path_key("apiary/hives", "api"), "apiary/hives");
/// ```
pub fn path_key(path: &str, prefix: &str) -> String {
    let path = path.trim_matches('/');
    let stripped = match path.strip_prefix(prefix) {
        Some(rest) if !prefix.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
        _ => path,
    };
    stripped.trim_matches('/').to_string()
}
