//! Hoists alternate servers shared by every operation of a path to the path.

use crate::openapi::{Document, Path, Server};
use indexmap::IndexMap;
use log::debug;

/// Moves identical alternate server lists from operations to their path.
///
/// Paths are grouped by their template. A group is merged when every one of its
/// operations declares alternate servers and all lists hold the same urls in
/// the same order; the paths then carry the list and the operations none.
/// Groups that do not qualify are left untouched.
///
/// Both the regular paths and the webhooks are processed. Running it again on
/// its own output changes nothing, since merged operations no longer declare
/// servers.
///
/// # Arguments
///
/// * `document` - The assembled document, modified in place
///
/// # Example
///
/// ```
/// use scramble::merger::move_same_alternative_servers_to_path;
/// use scramble::openapi::{Document, Info, Operation, Server};
/// use scramble::route::HttpMethod;
///
/// let mut document = Document::new(Info {
///     title: "API".to_string(),
///     version: "1.0.0".to_string(),
///     description: None,
/// });
/// for method in [HttpMethod::Get, HttpMethod::Post] {
///     let mut operation = Operation::new(method, "api/orders");
///     operation.set_servers(vec![Server::new("https://eu.example.com/api")]);
///     document.add_operation("orders", operation);
/// }
///
/// move_same_alternative_servers_to_path(&mut document);
/// let orders = document.path("orders").unwrap();
/// assert_eq!(orders.servers.len(), 1);
/// assert!(orders.operations.values().all(|o| o.servers.is_empty()));
/// ```
pub fn move_same_alternative_servers_to_path(document: &mut Document) {
    merge(&mut document.paths);
    merge(&mut document.webhooks);
}

fn merge(paths: &mut IndexMap<String, Path>) {
    // Group by template, not by key
    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (position, path) in paths.values().enumerate() {
        groups.entry(path.path.clone()).or_default().push(position);
    }

    for (template, members) in &groups {
        let Some(servers) = shared_servers(paths, members) else {
            continue;
        };
        debug!("Moving {} shared server(s) to path '{}'", servers.len(), template);

        for &position in members {
            if let Some((_, path)) = paths.get_index_mut(position) {
                path.set_servers(servers.clone());
                for operation in path.operations.values_mut() {
                    operation.set_servers(Vec::new());
                }
            }
        }
    }
}

/// The server list every operation of the group declares, if there is one
fn shared_servers(paths: &IndexMap<String, Path>, members: &[usize]) -> Option<Vec<Server>> {
    let mut operations = members
        .iter()
        .filter_map(|&position| paths.get_index(position))
        .flat_map(|(_, path)| path.operations.values());

    let first = operations.next()?;
    if first.servers.is_empty() {
        return None;
    }

    let expected = urls(&first.servers);
    operations
        .all(|operation| !operation.servers.is_empty() && urls(&operation.servers) == expected)
        .then(|| first.servers.clone())
}

fn urls(servers: &[Server]) -> Vec<&str> {
    servers.iter().map(|s| s.url.as_str()).collect()
}
