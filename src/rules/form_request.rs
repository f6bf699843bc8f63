//! Validation rules of request objects.
//!
//! Rule values come from registered [`FormRequest`](super::FormRequest)
//! instances when available and from the literal tuples of the `rules` method
//! body otherwise. Field documentation always comes from the source.

use super::{RequestRegistry, RuleExpression, Rules, ValidationRuleEntry};
use crate::doc_block::DocBlock;
use crate::infer::type_args;
use crate::parser::FileParser;
use crate::route::Route;
use crate::source_index::SourceIndex;
use anyhow::Result;
use log::{debug, warn};
use syn::punctuated::Punctuated;
use syn::visit::{self, Visit};
use syn::{Expr, ExprTuple, FnArg, Lit, Macro, Token, Type};

/// Wrappers whose first type argument is the actual request type
const REQUEST_WRAPPERS: &[&str] = &["Json", "Form", "Query", "Valid", "Validated", "Data"];

/// Reads the validation rules of the request objects a handler accepts.
///
/// A handler parameter is a request object when its type is registered in the
/// [`RequestRegistry`] or declares a `rules` method in the indexed sources.
/// Request types may be wrapped in extractors such as `Json<T>` or `Query<T>`.
///
/// # Example
///
/// ```no_run
/// use scramble::parser::FileParser;
/// use scramble::route::{HandlerRef, HttpMethod, Route};
/// use scramble::rules::{FormRequestRulesExtractor, RequestRegistry};
/// use scramble::source_index::SourceIndex;
/// use std::path::PathBuf;
///
/// let parser = FileParser::new();
/// let index = SourceIndex::build(&parser, &[PathBuf::from("src")]).unwrap();
/// let registry = RequestRegistry::new();
/// let route = Route::new(
///     vec![HttpMethod::Post],
///     "api/users",
///     HandlerRef::parse("UserController@store").unwrap(),
/// );
///
/// let (_, handler) = index.find_method(&parser, "UserController", "store").unwrap().unwrap();
/// let extractor = FormRequestRulesExtractor::new(&handler, &registry, &index, &parser);
/// if extractor.applies() {
///     for (field, rule) in extractor.extract(&route).unwrap() {
///         println!("{}: {}", field, rule);
///     }
/// }
/// ```
pub struct FormRequestRulesExtractor<'a> {
    handler: &'a syn::ImplItemFn,
    registry: &'a RequestRegistry,
    index: &'a SourceIndex,
    parser: &'a FileParser,
}

impl<'a> FormRequestRulesExtractor<'a> {
    /// Creates an extractor for one handler.
    ///
    /// # Arguments
    ///
    /// * `handler` - Syntax node of the handler method
    /// * `registry` - Request types that can be instantiated
    /// * `index` - Index locating the `rules` methods
    /// * `parser` - Parser backing the index
    pub fn new(
        handler: &'a syn::ImplItemFn,
        registry: &'a RequestRegistry,
        index: &'a SourceIndex,
        parser: &'a FileParser,
    ) -> Self {
        Self {
            handler,
            registry,
            index,
            parser,
        }
    }

    /// Whether the handler takes at least one request object
    pub fn applies(&self) -> bool {
        !self.request_types().is_empty()
    }

    /// Request object type names, in parameter order
    pub fn request_types(&self) -> Vec<String> {
        self.handler
            .sig
            .inputs
            .iter()
            .filter_map(|input| match input {
                FnArg::Typed(pat_type) => request_type_name(&pat_type.ty),
                FnArg::Receiver(_) => None,
            })
            .filter(|name| self.is_request_type(name))
            .collect()
    }

    fn is_request_type(&self, name: &str) -> bool {
        self.registry.contains(name) || self.index.declares_method(name, "rules")
    }

    /// Rules of every request object of the handler.
    ///
    /// A registered request type is instantiated with its default value and
    /// told the route's HTTP method before its rules are read, so rules that
    /// depend on the method resolve as they would at runtime. Unregistered
    /// types contribute the literal tuples of their `rules` body.
    ///
    /// When two request objects declare the same field the later one wins and
    /// a warning is logged.
    ///
    /// # Arguments
    ///
    /// * `route` - Route whose method is simulated
    ///
    /// # Returns
    ///
    /// Field names mapped to rule expressions, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns an error if a file holding a `rules` method cannot be parsed.
    pub fn extract(&self, route: &Route) -> Result<Rules> {
        let mut merged = Rules::new();

        for name in self.request_types() {
            let rules = match self.registry.instantiate(&name) {
                Some(mut request) => {
                    request.set_method(route.method());
                    request.rules()
                }
                None => {
                    debug!("{} is not registered, reading literal rules from source", name);
                    self.scan(&name)?.rules
                }
            };

            for (field, rule) in rules {
                if merged.contains_key(&field) {
                    warn!(
                        "Field '{}' of {} overrides a rule declared by another request object of {}",
                        field, name, route.handler
                    );
                }
                merged.insert(field, rule);
            }
        }

        Ok(merged)
    }

    /// Rule tuples of the `rules` method bodies that carry a doc comment.
    ///
    /// Only tuples whose field name is a string literal are found.
    ///
    /// # Errors
    ///
    /// Returns an error if a file holding a `rules` method cannot be parsed.
    pub fn documented_nodes(&self) -> Result<Vec<ValidationRuleEntry>> {
        let mut nodes = Vec::new();
        for name in self.request_types() {
            nodes.extend(self.scan(&name)?.documented);
        }
        Ok(nodes)
    }

    /// Extracted rules paired with the documentation written for each field.
    ///
    /// Docs are matched by field name; when several documented tuples share a
    /// name the last one is used.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Self::extract`] and [`Self::documented_nodes`].
    pub fn entries(&self, route: &Route) -> Result<Vec<ValidationRuleEntry>> {
        let documented = self.documented_nodes()?;

        let entries = self
            .extract(route)?
            .into_iter()
            .map(|(field, rule)| {
                let doc = documented
                    .iter()
                    .rev()
                    .find(|node| node.field == field)
                    .and_then(|node| node.doc.clone());
                ValidationRuleEntry { field, rule, doc }
            })
            .collect();
        Ok(entries)
    }

    fn scan(&self, type_name: &str) -> Result<RuleNodes> {
        let mut nodes = RuleNodes::default();
        if let Some((_, method)) = self.index.find_method(self.parser, type_name, "rules")? {
            nodes.visit_block(&method.block);
        }
        Ok(nodes)
    }
}

/// Type name of a request parameter, looking through references and wrappers
fn request_type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Reference(r) => request_type_name(&r.elem),
        Type::Paren(p) => request_type_name(&p.elem),
        Type::Path(type_path) => {
            let segment = type_path.path.segments.last()?;
            let name = segment.ident.to_string();
            if REQUEST_WRAPPERS.contains(&name.as_str()) {
                type_args(&segment.arguments)
                    .first()
                    .and_then(|inner| request_type_name(inner))
            } else {
                Some(name)
            }
        }
        _ => None,
    }
}

/// `("field", rule)` tuples found in a `rules` body
#[derive(Debug, Default)]
struct RuleNodes {
    /// Tuples whose rule is a literal
    rules: Rules,
    /// Tuples carrying a doc comment, whatever their rule
    documented: Vec<ValidationRuleEntry>,
}

impl<'ast> Visit<'ast> for RuleNodes {
    fn visit_expr_tuple(&mut self, tuple: &'ast ExprTuple) {
        if tuple.elems.len() == 2 {
            if let Some(field) = string_literal(&tuple.elems[0]) {
                let rule = literal_rule(&tuple.elems[1]);
                if let Some(rule) = &rule {
                    self.rules.insert(field.clone(), rule.clone());
                }
                if let Some(doc) = DocBlock::from_attrs(&tuple.attrs) {
                    self.documented.push(ValidationRuleEntry {
                        field,
                        rule: rule.unwrap_or_else(|| RuleExpression::List(Vec::new())),
                        doc: Some(doc),
                    });
                }
            }
        }
        visit::visit_expr_tuple(self, tuple);
    }

    fn visit_macro(&mut self, mac: &'ast Macro) {
        if let Ok(exprs) = mac.parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated) {
            for expr in &exprs {
                self.visit_expr(expr);
            }
        }
    }
}

fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Some(s.value()),
            _ => None,
        },
        Expr::MethodCall(call) if matches!(call.method.to_string().as_str(), "to_string" | "into" | "to_owned") => {
            string_literal(&call.receiver)
        }
        Expr::Call(call) if call.args.len() == 1 && is_string_from(&call.func) => string_literal(&call.args[0]),
        Expr::Paren(p) => string_literal(&p.expr),
        Expr::Group(g) => string_literal(&g.expr),
        _ => None,
    }
}

fn is_string_from(func: &Expr) -> bool {
    matches!(func, Expr::Path(path) if path.path.segments.last().is_some_and(|s| s.ident == "from"))
}

/// Rule written as a string literal or a list of string literals
fn literal_rule(expr: &Expr) -> Option<RuleExpression> {
    if let Some(text) = string_literal(expr) {
        return Some(RuleExpression::Text(text));
    }

    let list = |elems: &Punctuated<Expr, Token![,]>| {
        elems
            .iter()
            .map(string_literal)
            .collect::<Option<Vec<_>>>()
            .map(RuleExpression::List)
    };

    match expr {
        Expr::Array(array) => list(&array.elems),
        Expr::Reference(r) => literal_rule(&r.expr),
        Expr::Macro(mac) => mac
            .mac
            .parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated)
            .ok()
            .and_then(|elems| list(&elems)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::FormRequest;
    use crate::route::{HandlerRef, HttpMethod};
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const SOURCES: &str = r#"
        pub struct StoreUserRequest;

        impl StoreUserRequest {
            pub fn rules(&self) -> Rules {
                Rules::from([
                    /// Unique login of the user.
                    ("email", "required|email"),
                    ("name", vec!["required", "string", "max:255"]),
                    /// Free text.
                    ("bio", self.bio_rule()),
                ])
            }
        }

        pub struct AddressRequest;

        impl AddressRequest {
            pub fn rules(&self) -> Vec<(&'static str, &'static str)> {
                vec![
                    /// Two-letter country code.
                    ("country", "required|string|max:2"),
                    ("email", "nullable|email"),
                ]
            }
        }

        pub struct UserController;

        impl UserController {
            pub fn store(&self, request: Json<StoreUserRequest>, address: AddressRequest, id: u64) {}
            pub fn login(&self, request: LoginRequest) {}
            pub fn index(&self, page: Query<Pagination>) {}
        }
    "#;

    #[derive(Default)]
    struct LoginRequest {
        method: HttpMethod,
    }

    impl FormRequest for LoginRequest {
        fn set_method(&mut self, method: HttpMethod) {
            self.method = method;
        }

        fn rules(&self) -> Rules {
            let mut rules = Rules::new();
            rules.insert("email".to_string(), "required|email".into());
            if self.method != HttpMethod::Post {
                rules.insert("remember".to_string(), "boolean".into());
            }
            rules
        }
    }

    struct Fixture {
        _dir: TempDir,
        parser: FileParser,
        index: SourceIndex,
        registry: RequestRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join("app.rs"), SOURCES).unwrap();
            let parser = FileParser::new();
            let index = SourceIndex::build(&parser, &[dir.path().to_path_buf()]).unwrap();
            let mut registry = RequestRegistry::new();
            registry.register::<LoginRequest>("LoginRequest");
            Self {
                _dir: dir,
                parser,
                index,
                registry,
            }
        }

        fn handler(&self, method: &str) -> syn::ImplItemFn {
            self.index
                .find_method(&self.parser, "UserController", method)
                .unwrap()
                .unwrap()
                .1
        }

        fn extractor<'a>(&'a self, handler: &'a syn::ImplItemFn) -> FormRequestRulesExtractor<'a> {
            FormRequestRulesExtractor::new(handler, &self.registry, &self.index, &self.parser)
        }
    }

    fn route(method: HttpMethod, action: &str) -> Route {
        Route::new(vec![method], "api/users", HandlerRef::parse(action).unwrap())
    }

    #[test]
    fn test_applies_only_to_request_objects() {
        let fixture = Fixture::new();
        let store = fixture.handler("store");
        let index = fixture.handler("index");

        assert_eq!(
            fixture.extractor(&store).request_types(),
            vec!["StoreUserRequest", "AddressRequest"]
        );
        assert!(fixture.extractor(&store).applies());
        assert!(!fixture.extractor(&index).applies());
    }

    #[test]
    fn test_registered_request_is_simulated_with_route_method() {
        let fixture = Fixture::new();
        let login = fixture.handler("login");
        let extractor = fixture.extractor(&login);

        let rules = extractor
            .extract(&route(HttpMethod::Post, "UserController@login"))
            .unwrap();
        let mut expected = Rules::new();
        expected.insert("email".to_string(), RuleExpression::from("required|email"));
        assert_eq!(rules, expected);

        let rules = extractor
            .extract(&route(HttpMethod::Get, "UserController@login"))
            .unwrap();
        assert_eq!(rules.keys().collect::<Vec<_>>(), vec!["email", "remember"]);
    }

    #[test]
    fn test_literal_rules_are_read_from_source() {
        let fixture = Fixture::new();
        let store = fixture.handler("store");

        let rules = fixture
            .extractor(&store)
            .extract(&route(HttpMethod::Post, "UserController@store"))
            .unwrap();

        assert_eq!(rules.keys().collect::<Vec<_>>(), vec!["email", "name", "country"]);
        assert_eq!(rules["email"], RuleExpression::from("nullable|email"));
        assert_eq!(
            rules["name"],
            RuleExpression::from(vec!["required", "string", "max:255"])
        );
    }

    #[test]
    fn test_documented_nodes() {
        let fixture = Fixture::new();
        let store = fixture.handler("store");
        let extractor = fixture.extractor(&store);

        let nodes = extractor.documented_nodes().unwrap();
        let fields: Vec<_> = nodes.iter().map(|n| n.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "bio", "country"]);
        assert_eq!(nodes[1].description().as_deref(), Some("Free text."));

        let entries = extractor
            .entries(&route(HttpMethod::Post, "UserController@store"))
            .unwrap();
        let country = entries.iter().find(|e| e.field == "country").unwrap();
        assert_eq!(country.description().as_deref(), Some("Two-letter country code."));
        let name = entries.iter().find(|e| e.field == "name").unwrap();
        assert!(name.doc.is_none());
    }
}
