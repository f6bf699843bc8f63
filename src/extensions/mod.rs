//! Operation extensions.
//!
//! An [`OperationBuilder`] turns one route into one [`Operation`] by running its
//! extensions in the order they were registered. Extensions do not depend on
//! each other having run; each one only adds what it can derive and leaves
//! fields it does not own untouched.

pub mod deprecation;
pub mod request_body;
pub mod request_essentials;
pub mod response;

pub use deprecation::DeprecationExtension;
pub use request_body::RequestBodyExtension;
pub use request_essentials::RequestEssentialsExtension;
pub use response::ResponseExtension;

use crate::config::Config;
use crate::infer::TypeInference;
use crate::openapi::{Document, Operation, ServerFactory};
use crate::parser::FileParser;
use crate::route::Route;
use crate::route_info::RouteDescriptor;
use crate::rules::RequestRegistry;
use crate::source_index::SourceIndex;
use anyhow::Result;
use log::debug;

/// Read-only services available to extensions during one generation run
pub struct ExtensionContext<'a> {
    pub config: &'a Config,
    pub parser: &'a FileParser,
    pub index: &'a SourceIndex,
    pub registry: &'a RequestRegistry,
    pub servers: &'a ServerFactory,
}

impl<'a> ExtensionContext<'a> {
    pub fn infer(&self) -> TypeInference<'a> {
        TypeInference::new(self.parser, self.index)
    }
}

/// One independent analyzer contributing to an operation
pub trait OperationExtension {
    fn name(&self) -> &'static str;

    /// Adds what this extension derives from `route` to `operation`.
    ///
    /// `document` is the document under construction, for registering
    /// component schemas and reading its servers.
    fn handle(
        &self,
        operation: &mut Operation,
        route: &RouteDescriptor,
        document: &mut Document,
        context: &ExtensionContext<'_>,
    ) -> Result<()>;
}

/// Ordered extension list producing operations
pub struct OperationBuilder {
    extensions: Vec<Box<dyn OperationExtension>>,
}

impl Default for OperationBuilder {
    fn default() -> Self {
        Self::new(default_extensions())
    }
}

/// The default pipeline. Rule extraction runs before parameter synthesis inside
/// [`RequestBodyExtension`], after the path parameters are known.
pub fn default_extensions() -> Vec<Box<dyn OperationExtension>> {
    vec![
        Box::new(RequestEssentialsExtension),
        Box::new(RequestBodyExtension::default()),
        Box::new(ResponseExtension),
        Box::new(DeprecationExtension),
    ]
}

impl OperationBuilder {
    pub fn new(extensions: Vec<Box<dyn OperationExtension>>) -> Self {
        Self { extensions }
    }

    /// Appends an extension to the end of the pipeline
    pub fn push(&mut self, extension: Box<dyn OperationExtension>) -> &mut Self {
        self.extensions.push(extension);
        self
    }

    pub fn extension_names(&self) -> Vec<&'static str> {
        self.extensions.iter().map(|e| e.name()).collect()
    }

    /// Builds the operation of a route; `Ok(None)` for closure routes.
    ///
    /// The first failing extension aborts the build for this route.
    pub fn build(
        &self,
        route: &Route,
        document: &mut Document,
        context: &ExtensionContext<'_>,
    ) -> Result<Option<Operation>> {
        let Some(descriptor) = RouteDescriptor::new(route, context.index, context.parser)? else {
            debug!("Skipping closure route {}", route.uri);
            return Ok(None);
        };

        let mut operation = Operation::new(route.method(), &route.uri);
        for extension in &self.extensions {
            debug!("Running {} on {}", extension.name(), descriptor.reference());
            extension.handle(&mut operation, &descriptor, document, context)?;
        }

        Ok(Some(operation))
    }
}
