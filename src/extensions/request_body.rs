use super::{ExtensionContext, OperationExtension};
use crate::openapi::{Document, Operation, Parameter, ParameterLocation, RequestBody, Schema};
use crate::route_info::RouteDescriptor;
use crate::rules::{FormRequestRulesExtractor, RuleSchemaMapper, StandardRuleMapper, ValidationRuleEntry};
use anyhow::Result;
use log::debug;

/// Turns the validation rules of the handler's request objects into query
/// parameters (for methods reading the query string) or a JSON request body
pub struct RequestBodyExtension {
    mapper: Box<dyn RuleSchemaMapper>,
}

impl Default for RequestBodyExtension {
    fn default() -> Self {
        Self::new(Box::new(StandardRuleMapper))
    }
}

impl RequestBodyExtension {
    pub fn new(mapper: Box<dyn RuleSchemaMapper>) -> Self {
        Self { mapper }
    }

    fn field_schema(&self, entry: &ValidationRuleEntry) -> Schema {
        self.mapper
            .schema(&entry.rule)
            .with_description(entry.description())
    }

    fn body_schema(&self, entries: &[ValidationRuleEntry]) -> Schema {
        let mut schema = Schema::object();
        for entry in entries {
            let segments: Vec<&str> = entry.field.split('.').collect();
            insert_field(&mut schema, &segments, self.field_schema(entry), self.mapper.is_required(&entry.rule));
        }
        schema
    }
}

impl OperationExtension for RequestBodyExtension {
    fn name(&self) -> &'static str {
        "request_body"
    }

    fn handle(
        &self,
        operation: &mut Operation,
        route: &RouteDescriptor,
        _document: &mut Document,
        context: &ExtensionContext<'_>,
    ) -> Result<()> {
        let extractor =
            FormRequestRulesExtractor::new(&route.handler, context.registry, context.index, context.parser);
        if !extractor.applies() {
            return Ok(());
        }

        let entries = extractor.entries(&route.route)?;
        if entries.is_empty() {
            return Ok(());
        }
        debug!("{} validates {} field(s)", route.reference(), entries.len());

        if operation.method.reads_query() {
            for entry in entries.iter().filter(|e| !e.field.contains('.')) {
                // The description lives on the parameter, not its schema
                let schema = self.mapper.schema(&entry.rule);
                let parameter = Parameter::new(&entry.field, ParameterLocation::Query, schema)
                    .required(self.mapper.is_required(&entry.rule))
                    .with_description(entry.description());
                operation.add_parameter(parameter);
            }
            return Ok(());
        }

        let schema = self.body_schema(&entries);
        match &mut operation.request_body {
            Some(body) => {
                for media in body.content.values_mut() {
                    merge_object(&mut media.schema, &schema);
                }
            }
            None => operation.request_body = Some(RequestBody::json(schema)),
        }
        Ok(())
    }
}

/// Places a field schema at a dotted path, `items.*.id` nesting through arrays
fn insert_field(parent: &mut Schema, segments: &[&str], schema: Schema, required: bool) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };

    if *first == "*" {
        let items = parent.items.get_or_insert_with(|| Box::new(Schema::object()));
        if rest.is_empty() {
            **items = schema;
        } else {
            insert_field(items, rest, schema, required);
        }
        return;
    }

    if rest.is_empty() {
        if required && !parent.required.iter().any(|r| r == first) {
            parent.required.push(first.to_string());
        }
        match parent.properties.get_mut(*first) {
            // A parent declared before its children keeps the nested fields
            Some(existing) => {
                let nested = std::mem::take(&mut existing.properties);
                let items = existing.items.take();
                *existing = schema;
                existing.properties.extend(nested);
                if existing.items.is_none() {
                    existing.items = items;
                }
            }
            None => {
                parent.properties.insert(first.to_string(), schema);
            }
        }
        return;
    }

    let child = parent
        .properties
        .entry(first.to_string())
        .or_insert_with(Schema::object);
    let next = if rest.first() == Some(&"*") { "array" } else { "object" };
    if child.type_name().is_none() {
        child.set_type(next);
    }
    insert_field(child, rest, schema, required);
}

fn merge_object(target: &mut Schema, source: &Schema) {
    for (name, schema) in &source.properties {
        target.properties.insert(name.clone(), schema.clone());
    }
    for name in &source.required {
        if !target.required.contains(name) {
            target.required.push(name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::test_support::{document, Workspace};
    use crate::route::{HandlerRef, HttpMethod, Route};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SOURCE: &str = r#"
        pub struct StorePostRequest;

        impl StorePostRequest {
            pub fn rules(&self) -> Rules {
                Rules::from([
                    /// Headline shown in listings.
                    ("title", "required|string|max:120"),
                    ("status", "in:draft,published"),
                    ("tags", "array"),
                    ("tags.*", "string"),
                    ("author.email", "required|email"),
                ])
            }
        }

        pub struct PostController;

        impl PostController {
            pub fn index(&self, filters: Query<StorePostRequest>) {}
            pub fn store(&self, request: Json<StorePostRequest>) {}
            pub fn show(&self, id: u64) {}
        }
    "#;

    fn run(method: HttpMethod, action: &str) -> Operation {
        let workspace = Workspace::new(SOURCE);
        let route = Route::new(vec![method], "api/posts", HandlerRef::parse(action).unwrap());
        let descriptor = workspace.descriptor(&route);
        let mut operation = Operation::new(method, "api/posts");
        RequestBodyExtension::default()
            .handle(&mut operation, &descriptor, &mut document(), &workspace.context())
            .unwrap();
        operation
    }

    #[test]
    fn test_rules_become_json_body() {
        let operation = run(HttpMethod::Post, "PostController@store");
        assert!(operation.parameters.is_empty());

        let body = operation.request_body.unwrap();
        assert_eq!(
            serde_json::to_value(body.json_schema().unwrap()).unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Headline shown in listings.", "maxLength": 120},
                    "status": {"type": "string", "enum": ["draft", "published"]},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "author": {
                        "type": "object",
                        "properties": {"email": {"type": "string", "format": "email"}},
                        "required": ["email"]
                    }
                },
                "required": ["title"]
            })
        );
    }

    #[test]
    fn test_rules_become_query_parameters_for_get() {
        let operation = run(HttpMethod::Get, "PostController@index");
        assert!(operation.request_body.is_none());

        let names: Vec<_> = operation.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["title", "status", "tags"]);
        let title = operation.parameter("title").unwrap();
        assert_eq!(title.location, ParameterLocation::Query);
        assert!(title.required);
        assert_eq!(title.description.as_deref(), Some("Headline shown in listings."));
        assert!(title.schema.description.is_none());
        assert!(!operation.parameter("status").unwrap().required);
    }

    #[test]
    fn test_handler_without_request_object() {
        let operation = run(HttpMethod::Get, "PostController@show");
        assert!(operation.parameters.is_empty());
        assert!(operation.request_body.is_none());
    }
}
