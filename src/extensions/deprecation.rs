use super::{ExtensionContext, OperationExtension};
use crate::openapi::{Document, Operation};
use crate::route_info::RouteDescriptor;
use anyhow::Result;

/// Marks the operation deprecated when the handler doc block has a
/// `@deprecated` tag (or the handler carries `#[deprecated]`)
#[derive(Debug, Default)]
pub struct DeprecationExtension;

impl OperationExtension for DeprecationExtension {
    fn name(&self) -> &'static str {
        "deprecation"
    }

    fn handle(
        &self,
        operation: &mut Operation,
        route: &RouteDescriptor,
        _document: &mut Document,
        _context: &ExtensionContext<'_>,
    ) -> Result<()> {
        let Some(doc) = &route.doc else {
            return Ok(());
        };

        if doc.tags.iter().any(|tag| tag.name == "@deprecated") {
            operation.deprecated = true;
        }
        Ok(())
    }
}
