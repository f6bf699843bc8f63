use super::{ExtensionContext, OperationExtension};
use crate::infer::type_name;
use crate::openapi::{Document, Operation, Response, Schema};
use crate::route_info::RouteDescriptor;
use anyhow::Result;

/// Successful response typed from the handler's return type
#[derive(Debug, Default)]
pub struct ResponseExtension;

impl OperationExtension for ResponseExtension {
    fn name(&self) -> &'static str {
        "response"
    }

    fn handle(
        &self,
        operation: &mut Operation,
        route: &RouteDescriptor,
        document: &mut Document,
        context: &ExtensionContext<'_>,
    ) -> Result<()> {
        if operation.responses.contains_key("200") {
            return Ok(());
        }

        let schema = match route.return_type() {
            Some(ty) if !is_unit(ty) => context.infer().schema_for(ty, &mut document.components)?,
            _ => Schema::default(),
        };

        let response = if schema == Schema::default() {
            Response::new("OK")
        } else {
            Response::json("OK", schema)
        };
        operation.responses.insert("200".to_string(), response);
        Ok(())
    }
}

fn is_unit(ty: &syn::Type) -> bool {
    matches!(ty, syn::Type::Tuple(tuple) if tuple.elems.is_empty()) || type_name(ty).as_deref() == Some("StatusCode")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::test_support::{document, Workspace};
    use crate::route::{HandlerRef, HttpMethod, Route};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SOURCE: &str = r#"
        pub struct Tag {
            pub id: u32,
            pub label: String,
        }

        pub struct TagController;

        impl TagController {
            pub fn index(&self) -> Result<Json<Vec<Tag>>, ApiError> {
                todo!()
            }

            pub fn destroy(&self) -> StatusCode {
                StatusCode::NO_CONTENT
            }
        }
    "#;

    fn run(method: &str) -> (Operation, Document) {
        let workspace = Workspace::new(SOURCE);
        let route = Route::new(
            vec![HttpMethod::Get],
            "api/tags",
            HandlerRef::parse(&format!("TagController@{}", method)).unwrap(),
        );
        let descriptor = workspace.descriptor(&route);
        let mut operation = Operation::new(HttpMethod::Get, "api/tags");
        let mut document = document();
        ResponseExtension
            .handle(&mut operation, &descriptor, &mut document, &workspace.context())
            .unwrap();
        (operation, document)
    }

    #[test]
    fn test_return_type_becomes_response_schema() {
        let (operation, document) = run("index");
        assert_eq!(
            serde_json::to_value(&operation.responses).unwrap(),
            json!({
                "200": {
                    "description": "OK",
                    "content": {
                        "application/json": {
                            "schema": {"type": "array", "items": {"$ref": "#/components/schemas/Tag"}}
                        }
                    }
                }
            })
        );
        assert!(document.components.schemas.contains_key("Tag"));
    }

    #[test]
    fn test_untyped_response() {
        let (operation, document) = run("destroy");
        assert_eq!(operation.responses["200"], Response::new("OK"));
        assert!(document.components.is_empty());
    }
}
