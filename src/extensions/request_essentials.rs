use super::{ExtensionContext, OperationExtension};
use crate::openapi::{Document, Operation, Parameter, ParameterLocation, Schema, Server};
use crate::route_info::RouteDescriptor;
use anyhow::Result;
use heck::ToLowerCamelCase;
use log::debug;

/// Identity of the operation: id, tags, summary, path, path parameters and the
/// alternate servers of routes registered on their own domain
#[derive(Debug, Default)]
pub struct RequestEssentialsExtension;

impl OperationExtension for RequestEssentialsExtension {
    fn name(&self) -> &'static str {
        "request_essentials"
    }

    fn handle(
        &self,
        operation: &mut Operation,
        route: &RouteDescriptor,
        document: &mut Document,
        context: &ExtensionContext<'_>,
    ) -> Result<()> {
        let tag = tag_name(&route.class);

        if operation.operation_id.is_none() {
            operation.operation_id = Some(match &route.route.name {
                Some(name) => name.clone(),
                None => format!("{}.{}", tag.to_lower_camel_case(), route.method),
            });
        }
        if !operation.tags.contains(&tag) {
            operation.tags.push(tag);
        }

        if let Some(doc) = &route.doc {
            operation.summary = operation.summary.take().or_else(|| doc.summary.clone());
            operation.description = operation.description.take().or_else(|| doc.description.clone());
        }

        operation.path = normalize_path(&route.route.uri);

        let infer = context.infer();
        for name in path_parameters(&route.route.uri) {
            if operation.parameter(&name).is_some() {
                continue;
            }
            let schema = match route
                .params()
                .into_iter()
                .find(|(binding, _)| binding.as_deref() == Some(name.as_str()))
            {
                Some((_, ty)) => infer.schema_for(ty, &mut document.components)?,
                None => Schema::string(),
            };
            operation.add_parameter(Parameter::new(&name, ParameterLocation::Path, schema));
        }

        if let Some(domain) = &route.route.domain {
            let servers = alternative_servers(domain, document, context);
            debug!(
                "{} is served from {} alternate server(s)",
                route.reference(),
                servers.len()
            );
            operation.set_servers(servers);
        }

        Ok(())
    }
}

/// Handler type name without the `Controller` suffix
fn tag_name(class: &str) -> String {
    match class.strip_suffix("Controller") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => class.to_string(),
    }
}

/// `users/{user?}` -> `users/{user}`
pub fn normalize_path(uri: &str) -> String {
    uri.replace("?}", "}")
}

/// Names of the `{name}` segments of a uri template, in order
pub fn path_parameters(uri: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = uri;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else { break };
        let name = after[..end].trim_end_matches('?');
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        rest = &after[end + 1..];
    }
    names
}

/// Servers of a route bound to `domain`.
///
/// None when every document server already is the domain's server, the matching
/// document servers when some are, otherwise a server built for the domain.
fn alternative_servers(domain: &str, document: &Document, context: &ExtensionContext<'_>) -> Vec<Server> {
    let config = context.config;
    let base = if domain.contains("://") {
        domain.to_string()
    } else {
        format!("{}://{}", config.protocol(), domain)
    };
    let expected = context
        .servers
        .make(&config.url(&format!("{}/{}", base, config.api_path.trim_matches('/'))), "");

    if document.servers.iter().all(|s| s.url == expected.url) {
        return Vec::new();
    }

    let matching: Vec<Server> = document
        .servers
        .iter()
        .filter(|s| s.url == expected.url)
        .cloned()
        .collect();
    if matching.is_empty() {
        vec![expected]
    } else {
        matching
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
        pub struct UserController;

        impl UserController {
            /// Show a user.
            ///
            /// Loads the user with their profile.
            pub fn show(&self, Path(user): Path<u64>) -> Json<User> {
                todo!()
            }

            pub fn posts(&self) {}
        }
    "#;

    fn run(workspace: &Workspace, route: &Route, document: &mut Document) -> Operation {
        let descriptor = workspace.descriptor(route);
        let mut operation = Operation::new(route.method(), &route.uri);
        RequestEssentialsExtension
            .handle(&mut operation, &descriptor, document, &workspace.context())
            .unwrap();
        operation
    }

    #[test]
    fn test_identity_and_path_parameters() {
        let workspace = Workspace::new(SOURCE);
        let route = Route::new(
            vec![HttpMethod::Get],
            "api/users/{user}/posts/{post?}",
            HandlerRef::parse("UserController@show").unwrap(),
        );

        let operation = run(&workspace, &route, &mut document());
        assert_eq!(operation.operation_id.as_deref(), Some("user.show"));
        assert_eq!(operation.tags, vec!["User"]);
        assert_eq!(operation.summary.as_deref(), Some("Show a user."));
        assert_eq!(
            operation.description.as_deref(),
            Some("Loads the user with their profile.")
        );
        assert_eq!(operation.path, "api/users/{user}/posts/{post}");
        assert_eq!(
            serde_json::to_value(&operation.parameters).unwrap(),
            json!([
                {"name": "user", "in": "path", "required": true, "schema": {"type": "integer", "format": "int64"}},
                {"name": "post", "in": "path", "required": true, "schema": {"type": "string"}}
            ])
        );
        assert!(operation.servers.is_empty());
    }

    #[test]
    fn test_route_name_is_operation_id() {
        let workspace = Workspace::new(SOURCE);
        let route = Route::new(
            vec![HttpMethod::Get],
            "api/users/{user}/posts",
            HandlerRef::parse("UserController@posts").unwrap(),
        )
        .named("users.posts");

        let operation = run(&workspace, &route, &mut document());
        assert_eq!(operation.operation_id.as_deref(), Some("users.posts"));
        assert!(operation.summary.is_none());
    }

    #[test]
    fn test_alternative_servers_for_domain_routes() {
        let workspace = Workspace::new(SOURCE);
        let route = Route::new(
            vec![HttpMethod::Get],
            "api/users/{user}/posts",
            HandlerRef::parse("UserController@posts").unwrap(),
        )
        .on_domain("eu.example.com");

        let mut doc = document();
        doc.add_server(Server::new("http://localhost/api"));
        let operation = run(&workspace, &route, &mut doc);
        assert_eq!(
            operation.servers.iter().map(|s| s.url.as_str()).collect::<Vec<_>>(),
            vec!["http://eu.example.com/api"]
        );

        let mut doc = document();
        doc.add_server(Server::new("http://eu.example.com/api"));
        assert!(run(&workspace, &route, &mut doc).servers.is_empty());

        let mut doc = document();
        doc.add_server(Server::new("http://eu.example.com/api"));
        doc.add_server(Server::new("http://us.example.com/api"));
        let operation = run(&workspace, &route, &mut doc);
        assert_eq!(operation.servers, vec![Server::new("http://eu.example.com/api")]);
    }

    #[test]
    fn test_path_parameter_names() {
        assert_eq!(path_parameters("api/{a}/x/{b?}/{a}"), vec!["a", "b"]);
        assert!(path_parameters("api/users").is_empty());
        assert_eq!(normalize_path("api/{a?}"), "api/{a}");
    }
}
