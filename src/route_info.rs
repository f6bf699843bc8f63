//! Route descriptor: one route plus its resolved handler source.

use crate::doc_block::{DocBlock, DocTag};
use crate::error::Error;
use crate::parser::FileParser;
use crate::route::{HandlerRef, Route};
use crate::source_index::SourceIndex;
use anyhow::Result;
use log::debug;
use std::path::PathBuf;
use syn::{FnArg, Pat, ReturnType, Type};

/// A class-based route with the parsed syntax node of its handler.
///
/// Extensions read the handler signature and its doc block from here; the
/// descriptor lives for the duration of one operation build.
#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    pub route: Route,
    /// Handler type name without module path
    pub class: String,
    pub method: String,
    pub handler: syn::ImplItemFn,
    pub doc: Option<DocBlock>,
    /// File the handler was found in
    pub source: PathBuf,
}

impl RouteDescriptor {
    /// Resolves the handler of `route` in the source index.
    ///
    /// Closure routes give `Ok(None)`. A class-based route whose handler cannot
    /// be found is an error.
    pub fn new(route: &Route, index: &SourceIndex, parser: &FileParser) -> Result<Option<Self>> {
        let HandlerRef::Method { method, .. } = &route.handler else {
            return Ok(None);
        };
        let Some(class) = route.handler.class_ident() else {
            return Ok(None);
        };

        let Some((parsed, handler)) = index.find_method(parser, class, method)? else {
            return Err(Error::HandlerNotFound {
                handler: route.handler.to_string(),
            }
            .into());
        };

        debug!("Resolved {} in {}", route.handler, parsed.path.display());
        let doc = DocBlock::from_attrs(&handler.attrs);

        Ok(Some(Self {
            route: route.clone(),
            class: class.to_string(),
            method: method.to_string(),
            handler,
            doc,
            source: parsed.path.clone(),
        }))
    }

    /// `Class@method`
    pub fn reference(&self) -> String {
        format!("{}@{}", self.class, self.method)
    }

    /// Typed handler arguments (receiver excluded), with their binding name when
    /// the pattern is a plain identifier or a destructured wrapper like `Path(id)`
    pub fn params(&self) -> Vec<(Option<String>, &Type)> {
        self.handler
            .sig
            .inputs
            .iter()
            .filter_map(|input| match input {
                FnArg::Typed(pat_type) => Some((binding_name(&pat_type.pat), pat_type.ty.as_ref())),
                FnArg::Receiver(_) => None,
            })
            .collect()
    }

    pub fn return_type(&self) -> Option<&Type> {
        match &self.handler.sig.output {
            ReturnType::Type(_, ty) => Some(ty),
            ReturnType::Default => None,
        }
    }

    pub fn doc_tag(&self, name: &str) -> Option<&DocTag> {
        self.doc.as_ref()?.tag(name)
    }
}

fn binding_name(pat: &Pat) -> Option<String> {
    match pat {
        Pat::Ident(ident) => Some(ident.ident.to_string().trim_start_matches('_').to_string()),
        Pat::TupleStruct(tuple) if tuple.elems.len() == 1 => binding_name(&tuple.elems[0]),
        Pat::Reference(r) => binding_name(&r.pat),
        _ => None,
    }
}
