//! Validation rules of request objects.
//!
//! A request object is a type with a `rules` method mapping input field names to
//! rule expressions such as `"required|email"`. Rule values come from registered
//! [`FormRequest`] implementations; types that are only known from source have
//! their literal rules read from the method body instead.

pub mod form_request;
pub mod mapper;

pub use form_request::FormRequestRulesExtractor;
pub use mapper::{RuleSchemaMapper, StandardRuleMapper};

use crate::doc_block::DocBlock;
use crate::route::HttpMethod;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Constraint list of one field, written as `"a|b:1"` or `["a", "b:1"]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleExpression {
    Text(String),
    List(Vec<String>),
}

impl RuleExpression {
    /// The individual rules, `"required|max:255"` -> `["required", "max:255"]`
    pub fn parts(&self) -> Vec<&str> {
        match self {
            RuleExpression::Text(text) => text
                .split('|')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect(),
            RuleExpression::List(list) => list.iter().map(String::as_str).collect(),
        }
    }

    pub fn has(&self, rule: &str) -> bool {
        self.parts().iter().any(|part| rule_name(part) == rule)
    }
}

impl From<&str> for RuleExpression {
    fn from(value: &str) -> Self {
        RuleExpression::Text(value.to_string())
    }
}

impl From<Vec<&str>> for RuleExpression {
    fn from(value: Vec<&str>) -> Self {
        RuleExpression::List(value.into_iter().map(str::to_string).collect())
    }
}

impl fmt::Display for RuleExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleExpression::Text(text) => f.write_str(text),
            RuleExpression::List(list) => f.write_str(&list.join("|")),
        }
    }
}

/// Name part of a rule, `"max:255"` -> `"max"`
pub fn rule_name(rule: &str) -> &str {
    rule.split_once(':').map_or(rule, |(name, _)| name)
}

/// Field name to rule expression, in declaration order
pub type Rules = IndexMap<String, RuleExpression>;

/// One rule of a request object with the doc comment written above it
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRuleEntry {
    pub field: String,
    pub rule: RuleExpression,
    pub doc: Option<DocBlock>,
}

impl ValidationRuleEntry {
    pub fn description(&self) -> Option<String> {
        self.doc.as_ref().and_then(DocBlock::text)
    }
}

/// A request type whose validation rules can be produced without running a handler
pub trait FormRequest {
    /// Sets the HTTP method the request is simulated with
    fn set_method(&mut self, method: HttpMethod);

    fn rules(&self) -> Rules;
}

type Constructor = Box<dyn Fn() -> Box<dyn FormRequest>>;

/// Constructors of [`FormRequest`] types, keyed by type name
#[derive(Default)]
pub struct RequestRegistry {
    constructors: IndexMap<String, Constructor>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under the name handlers refer to it by
    pub fn register<T>(&mut self, name: &str) -> &mut Self
    where
        T: FormRequest + Default + 'static,
    {
        let construct: Constructor = Box::new(|| Box::new(T::default()) as Box<dyn FormRequest>);
        self.constructors.insert(name.to_string(), construct);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// A fresh default instance of the named request type
    pub fn instantiate(&self, name: &str) -> Option<Box<dyn FormRequest>> {
        self.constructors.get(name).map(|construct| construct())
    }
}

impl fmt::Debug for RequestRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestRegistry")
            .field("types", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
            if self.method == HttpMethod::Get {
                rules.insert("debug".to_string(), "boolean".into());
            }
            rules
        }
    }

    #[test]
    fn test_rule_parts() {
        let text = RuleExpression::from("required| max:255 |");
        assert_eq!(text.parts(), vec!["required", "max:255"]);
        assert!(text.has("max"));
        assert!(!text.has("min"));

        let list = RuleExpression::from(vec!["nullable", "in:a,b"]);
        assert_eq!(list.to_string(), "nullable|in:a,b");
        assert!(list.has("in"));
    }

    #[test]
    fn test_registry_instantiates_fresh_requests() {
        let mut registry = RequestRegistry::new();
        registry.register::<LoginRequest>("LoginRequest");
        assert!(registry.contains("LoginRequest"));
        assert!(registry.instantiate("SignupRequest").is_none());

        let mut request = registry.instantiate("LoginRequest").unwrap();
        assert_eq!(request.rules().len(), 2);
        request.set_method(HttpMethod::Post);
        assert_eq!(request.rules().len(), 1);

        let fresh = registry.instantiate("LoginRequest").unwrap();
        assert_eq!(fresh.rules().len(), 2);
    }
}
