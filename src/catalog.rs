//! Route discovery and filtering.
//!
//! The catalog decides which registered routes end up in the document. It never
//! fails: a handler that cannot be inspected simply does not carry a marker.

use crate::config::Config;
use crate::doc_block::DocBlock;
use crate::parser::FileParser;
use crate::route::{HandlerRef, Route, RouteSource};
use crate::source_index::SourceIndex;
use log::debug;
use std::rc::Rc;

/// Doc-comment marker restricting the generated document to one route
pub const ONLY_DOCS_MARKER: &str = "@only-docs";

/// Route names starting with this prefix belong to the generator itself
pub const RESERVED_NAME_PREFIX: &str = "scramble";

/// Route-acceptance predicate, `(route, path prefix) -> accepted`
pub type RouteResolver = Rc<dyn Fn(&Route, &str) -> bool>;

/// Enumerates the routes of a [`RouteSource`] that should be documented.
///
/// # Example
///
/// ```no_run
/// use scramble::catalog::RouteCatalog;
/// use scramble::config::Config;
/// use scramble::parser::FileParser;
/// use scramble::route::RouteTable;
/// use scramble::source_index::SourceIndex;
/// use std::path::{Path, PathBuf};
///
/// let routes = RouteTable::from_file(Path::new("routes.yaml")).unwrap();
/// let config = Config::default();
/// let parser = FileParser::new();
/// let index = SourceIndex::build(&parser, &[PathBuf::from("src")]).unwrap();
///
/// let catalog = RouteCatalog::new(&routes, &config, &parser, &index);
/// for route in catalog.discover("api") {
///     println!("{} {}", route.method(), route.uri);
/// }
/// ```
pub struct RouteCatalog<'a> {
    source: &'a dyn RouteSource,
    config: &'a Config,
    parser: &'a FileParser,
    index: &'a SourceIndex,
    resolver: Option<RouteResolver>,
}

impl<'a> RouteCatalog<'a> {
    /// Creates a catalog using [`default_resolver`].
    ///
    /// # Arguments
    ///
    /// * `source` - Registered routes, in registration order
    /// * `config` - Configuration read by the default resolver
    /// * `parser` - Parser used to read handler doc comments
    /// * `index` - Index locating handlers in the source tree
    pub fn new(
        source: &'a dyn RouteSource,
        config: &'a Config,
        parser: &'a FileParser,
        index: &'a SourceIndex,
    ) -> Self {
        Self {
            source,
            config,
            parser,
            index,
            resolver: None,
        }
    }

    /// Replaces the default acceptance predicate entirely.
    ///
    /// `None` keeps [`default_resolver`].
    pub fn with_resolver(mut self, resolver: Option<RouteResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Lists the routes to document under `path`.
    ///
    /// Filters are applied in this order:
    /// 1. When a handler is marked with [`ONLY_DOCS_MARKER`] only the first
    ///    marked route is considered
    /// 2. Routes named with [`RESERVED_NAME_PREFIX`] are dropped
    /// 3. The resolver must accept the route
    /// 4. Closure routes are dropped
    ///
    /// # Arguments
    ///
    /// * `path` - Route group prefix, e.g. `api` or `webhooks`
    ///
    /// # Returns
    ///
    /// The accepted routes, in registration order.
    pub fn discover(&self, path: &str) -> Vec<Route> {
        let routes = self.source.routes();

        // Only-docs short-circuit
        let candidates: &[Route] = match routes.iter().position(|r| self.is_only_docs(r)) {
            Some(position) => {
                debug!("Only documenting {}", routes[position].handler);
                &routes[position..=position]
            }
            None => routes,
        };

        candidates
            .iter()
            .filter(|route| {
                !route
                    .name
                    .as_deref()
                    .is_some_and(|name| name.starts_with(RESERVED_NAME_PREFIX))
            })
            .filter(|route| self.accepts(route, path))
            .filter(|route| route.is_class_based())
            .cloned()
            .collect()
    }

    fn accepts(&self, route: &Route, path: &str) -> bool {
        match &self.resolver {
            Some(resolver) => resolver(route, path),
            None => default_resolver(self.config, route, path),
        }
    }

    /// Best-effort marker detection: any lookup failure counts as unmarked
    fn is_only_docs(&self, route: &Route) -> bool {
        let HandlerRef::Method { method, .. } = &route.handler else {
            return false;
        };
        let Some(class) = route.handler.class_ident() else {
            return false;
        };

        match self.index.find_method(self.parser, class, method) {
            Ok(Some((_, handler))) => DocBlock::from_attrs(&handler.attrs)
                .is_some_and(|doc| doc.contains(ONLY_DOCS_MARKER)),
            _ => false,
        }
    }
}

/// Default route-acceptance predicate.
///
/// Accepts routes whose uri starts with `path`. When `api_domain` is configured
/// the route must also be registered on exactly that domain.
///
/// # Arguments
///
/// * `config` - Configuration holding the expected API domain
/// * `route` - Candidate route
/// * `path` - Route group prefix
pub fn default_resolver(config: &Config, route: &Route, path: &str) -> bool {
    let domain_matches = match config.api_domain.as_deref() {
        Some(expected) if !expected.is_empty() => route.domain.as_deref() == Some(expected),
        _ => true,
    };
    route.uri.starts_with(path) && domain_matches
}
