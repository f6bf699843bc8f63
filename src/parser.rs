use crate::error::Error;
use anyhow::{Context, Result};
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// AST parser for Rust source files, memoised per path.
///
/// The same file usually backs several handlers and request types, so a
/// generation run parses it once. [`FileParser::clear`] drops the cache; it must be
/// called between independent runs so edited files are read again.
///
/// # Example
///
/// ```no_run
/// use scramble::parser::FileParser;
/// use std::path::Path;
///
/// let parser = FileParser::new();
/// let parsed = parser.parse(Path::new("src/controllers.rs")).unwrap();
/// let show = parsed.find_method("UserController@show");
/// println!("found handler: {}", show.is_some());
/// ```
#[derive(Debug, Default)]
pub struct FileParser {
    cache: RefCell<HashMap<PathBuf, Rc<ParsedFile>>>,
}

/// A successfully parsed Rust file with its abstract syntax tree.
#[derive(Debug)]
pub struct ParsedFile {
    /// Path to the source file
    pub path: PathBuf,
    /// The parsed abstract syntax tree
    pub syntax_tree: syn::File,
}

impl FileParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a file, returning the cached tree when it was parsed before.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid Rust
    /// syntax; the latter carries the line and column of the failure.
    pub fn parse(&self, path: &Path) -> Result<Rc<ParsedFile>> {
        if let Some(parsed) = self.cache.borrow().get(path) {
            return Ok(Rc::clone(parsed));
        }

        debug!("Parsing file: {}", path.display());
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let syntax_tree = syn::parse_file(&content)
            .map_err(|e| Error::from_syn(path, &e))
            .with_context(|| format!("Failed to parse Rust syntax in file: {}", path.display()))?;

        let parsed = Rc::new(ParsedFile {
            path: path.to_path_buf(),
            syntax_tree,
        });
        self.cache
            .borrow_mut()
            .insert(path.to_path_buf(), Rc::clone(&parsed));

        Ok(parsed)
    }

    /// Invalidates every cached syntax tree
    pub fn clear(&self) {
        let mut cache = self.cache.borrow_mut();
        debug!("Dropping {} cached syntax trees", cache.len());
        cache.clear();
    }

    pub fn cached_files(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl ParsedFile {
    /// Finds a method by `Type@method`, searching `impl` blocks at any module depth.
    pub fn find_method(&self, reference: &str) -> Option<&syn::ImplItemFn> {
        let (class, method) = reference.split_once('@')?;
        let class = class.rsplit("::").next().unwrap_or(class);
        find_method_in(&self.syntax_tree.items, class, method)
    }

    pub fn find_struct(&self, name: &str) -> Option<&syn::ItemStruct> {
        find_item(&self.syntax_tree.items, &|item| match item {
            syn::Item::Struct(s) if s.ident == name => Some(s),
            _ => None,
        })
    }

    pub fn find_enum(&self, name: &str) -> Option<&syn::ItemEnum> {
        find_item(&self.syntax_tree.items, &|item| match item {
            syn::Item::Enum(e) if e.ident == name => Some(e),
            _ => None,
        })
    }
}

/// Name of the type an `impl` block is for (`impl Foo`, `impl Trait for Foo<T>`)
pub(crate) fn impl_self_ident(item_impl: &syn::ItemImpl) -> Option<String> {
    match item_impl.self_ty.as_ref() {
        syn::Type::Path(type_path) => type_path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

fn find_method_in<'a>(items: &'a [syn::Item], class: &str, method: &str) -> Option<&'a syn::ImplItemFn> {
    for item in items {
        match item {
            syn::Item::Impl(item_impl) if impl_self_ident(item_impl).as_deref() == Some(class) => {
                let found = item_impl.items.iter().find_map(|impl_item| match impl_item {
                    syn::ImplItem::Fn(f) if f.sig.ident == method => Some(f),
                    _ => None,
                });
                if found.is_some() {
                    return found;
                }
            }
            syn::Item::Mod(item_mod) => {
                if let Some((_, nested)) = &item_mod.content {
                    if let Some(found) = find_method_in(nested, class, method) {
                        return Some(found);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn find_item<'a, T, F>(items: &'a [syn::Item], pick: &F) -> Option<&'a T>
where
    F: Fn(&'a syn::Item) -> Option<&'a T>,
{
    for item in items {
        if let Some(found) = pick(item) {
            return Some(found);
        }
        if let syn::Item::Mod(syn::ItemMod {
            content: Some((_, nested)),
            ..
        }) = item
        {
            if let Some(found) = find_item(nested, pick) {
                return Some(found);
            }
        }
    }
    None
}
