//! Type inference: resolves Rust types found in handler signatures to schemas.
//!
//! Types declared in the scanned sources become component schemas referenced by
//! `$ref`; the component is inserted before its fields are resolved so recursive
//! types terminate. Types that cannot be resolved produce an empty schema rather
//! than an error, since handler code is only partially typed.

use crate::doc_block::DocBlock;
use crate::openapi::{Components, Schema};
use crate::parser::FileParser;
use crate::source_index::SourceIndex;
use anyhow::Result;
use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use log::debug;
use std::cell::RefCell;
use syn::{Attribute, Fields, GenericArgument, PathArguments, Type};

/// Type inference over the indexed source tree.
///
/// Single-field tuple structs are inlined as their inner type. A newtype that
/// refers back to itself (`struct Tree(Vec<Tree>)`) cannot be inlined, so it is
/// registered as a component instead.
pub struct TypeInference<'a> {
    parser: &'a FileParser,
    index: &'a SourceIndex,
    /// Newtypes currently being inlined, innermost last
    inlining: RefCell<Vec<String>>,
    /// Newtypes met again while being inlined
    recursive: RefCell<Vec<String>>,
}

/// Serde attributes that change the shape of a schema
#[derive(Debug, Default)]
struct SerdeAttrs {
    rename: Option<String>,
    rename_all: Option<String>,
    skip: bool,
    default: bool,
}

impl<'a> TypeInference<'a> {
    /// Creates a type inference over `index`.
    ///
    /// # Arguments
    ///
    /// * `parser` - Parser whose cache backs the index
    /// * `index` - Type index of the scanned sources
    pub fn new(parser: &'a FileParser, index: &'a SourceIndex) -> Self {
        Self {
            parser,
            index,
            inlining: RefCell::new(Vec::new()),
            recursive: RefCell::new(Vec::new()),
        }
    }

    /// Resolves a type to a schema, registering component schemas as needed.
    ///
    /// # Arguments
    ///
    /// * `ty` - Type as written in a handler signature or a struct field
    /// * `components` - Component schemas of the document being built
    ///
    /// # Returns
    ///
    /// The inline schema, or a `$ref` to a component for structs and enums
    /// declared in the sources. Types that cannot be resolved give an empty
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns an error if a file defining a referenced type cannot be parsed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use scramble::infer::TypeInference;
    /// use scramble::openapi::Components;
    /// use scramble::parser::FileParser;
    /// use scramble::source_index::SourceIndex;
    /// use std::path::PathBuf;
    ///
    /// let parser = FileParser::new();
    /// let index = SourceIndex::build(&parser, &[PathBuf::from("src")]).unwrap();
    /// let infer = TypeInference::new(&parser, &index);
    ///
    /// let mut components = Components::default();
    /// let ty: syn::Type = syn::parse_str("Json<Vec<User>>").unwrap();
    /// let schema = infer.schema_for(&ty, &mut components).unwrap();
    /// ```
    pub fn schema_for(&self, ty: &Type, components: &mut Components) -> Result<Schema> {
        match ty {
            Type::Reference(r) => self.schema_for(&r.elem, components),
            Type::Paren(p) => self.schema_for(&p.elem, components),
            Type::Group(g) => self.schema_for(&g.elem, components),
            Type::Slice(s) => Ok(Schema::array(self.schema_for(&s.elem, components)?)),
            Type::Array(a) => Ok(Schema::array(self.schema_for(&a.elem, components)?)),
            Type::Path(type_path) => {
                let Some(segment) = type_path.path.segments.last() else {
                    return Ok(Schema::default());
                };
                self.segment_schema(segment, components)
            }
            _ => Ok(Schema::default()),
        }
    }

    fn segment_schema(&self, segment: &syn::PathSegment, components: &mut Components) -> Result<Schema> {
        let name = segment.ident.to_string();
        let args = type_args(&segment.arguments);

        if let Some(schema) = primitive_schema(&name) {
            return Ok(schema);
        }

        let schema = match (name.as_str(), args.as_slice()) {
            ("Option", [inner]) => self.schema_for(inner, components)?.nullable(),
            ("Vec" | "VecDeque" | "HashSet" | "BTreeSet" | "IndexSet", [inner]) => {
                Schema::array(self.schema_for(inner, components)?)
            }
            ("HashMap" | "BTreeMap" | "IndexMap", [_, value, ..]) => Schema {
                additional_properties: Some(Box::new(self.schema_for(value, components)?)),
                ..Schema::object()
            },
            (
                "Json" | "Path" | "Query" | "Form" | "Box" | "Rc" | "Arc" | "Cow" | "Result" | "Data"
                | "Valid",
                [inner, ..],
            ) => self.schema_for(inner, components)?,
            ("Value", _) => Schema::default(),
            _ if args.is_empty() => self.named_schema(&name, components)?,
            _ => Schema::default(),
        };

        Ok(schema)
    }

    /// Component reference for a type declared in the sources.
    ///
    /// Already registered components are referenced without another lookup.
    fn named_schema(&self, name: &str, components: &mut Components) -> Result<Schema> {
        if components.schemas.contains_key(name) {
            return Ok(Schema::reference(name));
        }

        let Some(parsed) = self.index.definition(self.parser, name)? else {
            debug!("Unknown type {}, using an empty schema", name);
            return Ok(Schema::default());
        };

        if let Some(item) = parsed.find_struct(name) {
            if let Fields::Unnamed(fields) = &item.fields {
                if fields.unnamed.len() == 1 {
                    return self.newtype_schema(name, &fields.unnamed[0].ty, components);
                }
            }

            // Placeholder first so self-references resolve to a $ref
            components.schemas.insert(name.to_string(), Schema::object());
            let schema = self
                .struct_schema(item, components)?
                .with_description(DocBlock::from_attrs(&item.attrs).and_then(|d| d.text()));
            components.schemas.insert(name.to_string(), schema);
            return Ok(Schema::reference(name));
        }

        if let Some(item) = parsed.find_enum(name) {
            let schema = enum_schema(item)
                .with_description(DocBlock::from_attrs(&item.attrs).and_then(|d| d.text()));
            components.schemas.insert(name.to_string(), schema);
            return Ok(Schema::reference(name));
        }

        Ok(Schema::default())
    }

    /// Inlines the inner type of a newtype, falling back to a component when
    /// the inner type refers back to the newtype
    fn newtype_schema(&self, name: &str, inner: &Type, components: &mut Components) -> Result<Schema> {
        if self.inlining.borrow().iter().any(|n| n == name) {
            self.recursive.borrow_mut().push(name.to_string());
            return Ok(Schema::reference(name));
        }

        self.inlining.borrow_mut().push(name.to_string());
        let result = self.schema_for(inner, components);
        self.inlining.borrow_mut().pop();
        let schema = result?;

        let mut recursive = self.recursive.borrow_mut();
        if !recursive.iter().any(|n| n == name) {
            return Ok(schema);
        }
        recursive.retain(|n| n != name);
        debug!("{} refers to itself, registering it as a component", name);
        components.schemas.insert(name.to_string(), schema);
        Ok(Schema::reference(name))
    }

    fn struct_schema(&self, item: &syn::ItemStruct, components: &mut Components) -> Result<Schema> {
        let container = serde_attrs(&item.attrs);
        let mut schema = Schema::object();

        let Fields::Named(fields) = &item.fields else {
            return Ok(schema);
        };

        for field in &fields.named {
            let Some(ident) = &field.ident else { continue };
            let attrs = serde_attrs(&field.attrs);
            if attrs.skip {
                continue;
            }

            let name = attrs.rename.clone().unwrap_or_else(|| {
                let raw = ident.to_string();
                let raw = raw.trim_start_matches("r#");
                match container.rename_all.as_deref() {
                    Some(rule) => rename_field(rule, raw),
                    None => raw.to_string(),
                }
            });

            let field_schema = self
                .schema_for(&field.ty, components)?
                .with_description(DocBlock::from_attrs(&field.attrs).and_then(|d| d.text()));

            if !is_option(&field.ty) && !attrs.default && !container.default {
                schema.required.push(name.clone());
            }
            schema.properties.insert(name, field_schema);
        }

        Ok(schema)
    }
}

fn enum_schema(item: &syn::ItemEnum) -> Schema {
    let all_unit = item.variants.iter().all(|v| matches!(v.fields, Fields::Unit));
    if !all_unit {
        return Schema::object();
    }

    let container = serde_attrs(&item.attrs);
    let mut schema = Schema::string();
    for variant in &item.variants {
        let attrs = serde_attrs(&variant.attrs);
        if attrs.skip {
            continue;
        }
        let name = attrs.rename.unwrap_or_else(|| {
            let raw = variant.ident.to_string();
            match container.rename_all.as_deref() {
                Some(rule) => rename_variant(rule, &raw),
                None => raw,
            }
        });
        schema.enum_values.push(name.into());
    }
    schema
}

/// Scalar schema for built-in types.
///
/// Covers the integer and float primitives, `bool`, strings, and the common
/// uuid and date types.
///
/// # Returns
///
/// `None` when `name` is not a known scalar.
pub fn primitive_schema(name: &str) -> Option<Schema> {
    let schema = match name {
        "String" | "str" | "char" => Schema::string(),
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" => Schema::integer().with_format("int32"),
        "i64" | "i128" | "u64" | "u128" | "isize" | "usize" => Schema::integer().with_format("int64"),
        "f32" => Schema::number().with_format("float"),
        "f64" => Schema::number().with_format("double"),
        "bool" => Schema::boolean(),
        "Uuid" => Schema::string().with_format("uuid"),
        "DateTime" | "NaiveDateTime" | "OffsetDateTime" => Schema::string().with_format("date-time"),
        "NaiveDate" | "Date" => Schema::string().with_format("date"),
        _ => return None,
    };
    Some(schema)
}

/// Generic type arguments of a path segment (`Vec<T>` -> `[T]`).
///
/// Lifetimes and const arguments are left out.
pub fn type_args(arguments: &PathArguments) -> Vec<&Type> {
    match arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Last path segment name of a type, looking through references
pub fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Reference(r) => type_name(&r.elem),
        Type::Paren(p) => type_name(&p.elem),
        Type::Path(type_path) => type_path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

fn is_option(ty: &Type) -> bool {
    type_name(ty).as_deref() == Some("Option")
}

fn serde_attrs(attrs: &[Attribute]) -> SerdeAttrs {
    let mut parsed = SerdeAttrs::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(syn::Token![=]) {
                let value: syn::LitStr = meta.value()?.parse()?;
                parsed.rename = Some(value.value());
            } else if meta.path.is_ident("rename_all") && meta.input.peek(syn::Token![=]) {
                let value: syn::LitStr = meta.value()?.parse()?;
                parsed.rename_all = Some(value.value());
            } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                parsed.skip = true;
            } else if meta.path.is_ident("default") {
                parsed.default = true;
                if meta.input.peek(syn::Token![=]) {
                    let _: syn::Expr = meta.value()?.parse()?;
                }
            } else if meta.input.peek(syn::Token![=]) {
                let _: syn::Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in meta.input);
                let _: proc_macro2::TokenStream = content.parse()?;
            }
            Ok(())
        });

        if let Err(e) = result {
            debug!("Ignoring unreadable serde attribute: {}", e);
        }
    }

    parsed
}

fn rename_field(rule: &str, name: &str) -> String {
    match rule {
        "camelCase" => name.to_lower_camel_case(),
        "PascalCase" => name.to_upper_camel_case(),
        "kebab-case" => name.to_kebab_case(),
        "SCREAMING_SNAKE_CASE" => name.to_shouty_snake_case(),
        "UPPERCASE" => name.to_uppercase(),
        _ => name.to_string(),
    }
}

fn rename_variant(rule: &str, name: &str) -> String {
    match rule {
        "snake_case" => name.to_snake_case(),
        "camelCase" => name.to_lower_camel_case(),
        "kebab-case" => name.to_kebab_case(),
        "SCREAMING_SNAKE_CASE" => name.to_shouty_snake_case(),
        "lowercase" => name.to_lowercase(),
        "UPPERCASE" => name.to_uppercase(),
        _ => name.to_string(),
    }
}
