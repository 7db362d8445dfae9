//! Tree rendering of a resolved dependency graph.

use std::collections::HashSet;
use thiserror::Error;

use super::graph::{DependencyGraph, GraphNode};
use super::types::{DomainName, SemanticVersion};

const BRANCH: &str = "└─ ";
const CONTINUATION: &str = "│  ";

/// The requested root is not part of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}@{version} is not in the dependency graph")]
pub struct RenderError {
    pub name: DomainName,
    pub version: SemanticVersion,
}

/// Render the subtree rooted at `name@version`, one string per line.
///
/// Dependencies are listed in name order. A resolved or failed node that was
/// already printed earlier in the walk is repeated as `name@version ..`
/// without its subtree.
///
/// # Errors
/// Returns [`RenderError`] if the root is absent from the graph.
pub fn render_graph(
    graph: &DependencyGraph,
    name: &DomainName,
    version: &SemanticVersion,
) -> Result<Vec<String>, RenderError> {
    if !graph.has_node_at(name, version) {
        return Err(RenderError {
            name: name.clone(),
            version: version.clone(),
        });
    }

    let mut printed = HashSet::new();
    Ok(render_node(graph, name, version, &mut printed))
}

fn render_node<'g>(
    graph: &'g DependencyGraph,
    name: &'g DomainName,
    version: &'g SemanticVersion,
    printed: &mut HashSet<(&'g DomainName, &'g SemanticVersion)>,
) -> Vec<String> {
    let label = format!("{name}@{version}");

    let node = match graph.try_get_node(name, version) {
        None | Some(GraphNode::Unresolved) => return vec![label],
        Some(node) => node,
    };

    if !printed.insert((name, version)) {
        return vec![format!("{label} ..")];
    }

    let mut lines = vec![label];
    match node {
        GraphNode::Unresolved => {}
        GraphNode::Resolved { dependencies, .. } => {
            for (dep_name, dep_version) in dependencies {
                let child = render_node(graph, dep_name, dep_version, printed);
                lines.extend(child.into_iter().enumerate().map(|(i, line)| {
                    let prefix = if i == 0 { BRANCH } else { CONTINUATION };
                    format!("{prefix}{line}")
                }));
            }
        }
        GraphNode::Failed { errors } => {
            lines.extend(
                errors
                    .iter()
                    .map(|(registry, error)| format!("  - \"{registry}\": {}", error.summary())),
            );
        }
    }
    lines
}
