//! Dependency graph model.
//!
//! The graph is an arena keyed by `(name, version)`. Every transition takes
//! the graph by value and returns the updated graph. A node leaves
//! [`GraphNode::Unresolved`] at most once; settled nodes are never
//! overwritten by the `mark_*` transitions, which is what makes resolution
//! terminate on cycles and share work across diamond shapes.

use serde::Serialize;
use std::collections::BTreeMap;

use super::error::ResolveError;
use super::types::{DomainName, RegistrySource, RegistryUrl, SemanticVersion};

/// Schema version for JSON graph output.
pub const DEPS_GRAPH_SCHEMA_VERSION: u32 = 1;

/// State of one `(name, version)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphNode {
    /// Placeholder; no resolution attempted yet.
    Unresolved,
    /// Found in a registry, or bundled with the editor.
    Resolved {
        source: RegistrySource,
        dependencies: BTreeMap<DomainName, SemanticVersion>,
    },
    /// No registry could provide the pair. One error per registry tried.
    Failed {
        errors: BTreeMap<RegistryUrl, ResolveError>,
    },
}

impl GraphNode {
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Map of package name to version to node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    nodes: BTreeMap<DomainName, BTreeMap<SemanticVersion, GraphNode>>,
}

impl DependencyGraph {
    /// Graph holding a single unresolved seed node.
    #[must_use]
    pub fn from_seed(name: DomainName, version: SemanticVersion) -> Self {
        Self::default().set_node(name, version, GraphNode::Unresolved)
    }

    /// Insert or replace a node unconditionally.
    #[must_use]
    pub fn set_node(mut self, name: DomainName, version: SemanticVersion, node: GraphNode) -> Self {
        self.nodes.entry(name).or_default().insert(version, node);
        self
    }

    #[must_use]
    pub fn try_get_node(&self, name: &DomainName, version: &SemanticVersion) -> Option<&GraphNode> {
        self.nodes.get(name).and_then(|versions| versions.get(version))
    }

    #[must_use]
    pub fn has_node_at(&self, name: &DomainName, version: &SemanticVersion) -> bool {
        self.try_get_node(name, version).is_some()
    }

    /// Some unresolved pair, or `None` when resolution is complete.
    ///
    /// Pairs are picked in name then version order.
    #[must_use]
    pub fn try_get_next_unresolved(&self) -> Option<(&DomainName, &SemanticVersion)> {
        self.traverse()
            .find(|(_, _, node)| node.is_unresolved())
            .map(|(name, version, _)| (name, version))
    }

    /// Resolve a pair as a built-in package with no dependencies.
    #[must_use]
    pub fn mark_built_in_resolved(self, name: DomainName, version: SemanticVersion) -> Self {
        self.settle(
            name,
            version,
            GraphNode::Resolved {
                source: RegistrySource::BuiltIn,
                dependencies: BTreeMap::new(),
            },
        )
    }

    /// Resolve a pair from a registry and add placeholders for any
    /// dependency not yet in the graph.
    #[must_use]
    pub fn mark_remote_resolved(
        self,
        name: DomainName,
        version: SemanticVersion,
        source: RegistryUrl,
        dependencies: BTreeMap<DomainName, SemanticVersion>,
    ) -> Self {
        let placeholders: Vec<(DomainName, SemanticVersion)> = dependencies
            .iter()
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect();

        let mut graph = self.settle(
            name,
            version,
            GraphNode::Resolved {
                source: RegistrySource::Registry(source),
                dependencies,
            },
        );

        for (dep_name, dep_version) in placeholders {
            if !graph.has_node_at(&dep_name, &dep_version) {
                graph = graph.set_node(dep_name, dep_version, GraphNode::Unresolved);
            }
        }
        graph
    }

    /// Record that no registry could provide a pair.
    #[must_use]
    pub fn mark_failed(
        self,
        name: DomainName,
        version: SemanticVersion,
        errors: BTreeMap<RegistryUrl, ResolveError>,
    ) -> Self {
        self.settle(name, version, GraphNode::Failed { errors })
    }

    /// All `(name, version, node)` triples in name then version order.
    pub fn traverse(&self) -> impl Iterator<Item = (&DomainName, &SemanticVersion, &GraphNode)> {
        self.nodes.iter().flat_map(|(name, versions)| {
            versions
                .iter()
                .map(move |(version, node)| (name, version, node))
        })
    }

    /// Collected form of [`Self::traverse`].
    #[must_use]
    pub fn flatten(&self) -> Vec<(&DomainName, &SemanticVersion, &GraphNode)> {
        self.traverse().collect()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.values().map(BTreeMap::len).sum()
    }

    /// Failed nodes, in traversal order.
    pub fn failures(
        &self,
    ) -> impl Iterator<Item = (&DomainName, &SemanticVersion, &BTreeMap<RegistryUrl, ResolveError>)>
    {
        self.traverse().filter_map(|(name, version, node)| match node {
            GraphNode::Failed { errors } => Some((name, version, errors)),
            _ => None,
        })
    }

    /// Serializable node list for JSON output.
    #[must_use]
    pub fn to_entries(&self) -> Vec<GraphEntry> {
        self.traverse()
            .map(|(name, version, node)| GraphEntry::new(name, version, node))
            .collect()
    }

    /// Replace a node only while it is absent or unresolved.
    fn settle(self, name: DomainName, version: SemanticVersion, node: GraphNode) -> Self {
        match self.try_get_node(&name, &version) {
            Some(existing) if !existing.is_unresolved() => {
                tracing::debug!(name = %name, version = %version, "node already settled");
                self
            }
            _ => {
                tracing::debug!(name = %name, version = %version, state = node_state(&node), "node settled");
                self.set_node(name, version, node)
            }
        }
    }
}

fn node_state(node: &GraphNode) -> &'static str {
    match node {
        GraphNode::Unresolved => "unresolved",
        GraphNode::Resolved { .. } => "resolved",
        GraphNode::Failed { .. } => "failed",
    }
}

/// One graph node in JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct GraphEntry {
    pub name: String,
    pub version: String,
    /// `unresolved`, `resolved`, or `failed`.
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphEntryError>,
}

/// A per-registry failure in JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct GraphEntryError {
    pub registry: String,
    pub message: String,
}

impl GraphEntry {
    fn new(name: &DomainName, version: &SemanticVersion, node: &GraphNode) -> Self {
        let mut entry = Self {
            name: name.to_string(),
            version: version.to_string(),
            state: node_state(node),
            source: None,
            dependencies: BTreeMap::new(),
            errors: Vec::new(),
        };
        match node {
            GraphNode::Unresolved => {}
            GraphNode::Resolved {
                source,
                dependencies,
            } => {
                entry.source = Some(source.to_string());
                entry.dependencies = dependencies
                    .iter()
                    .map(|(n, v)| (n.to_string(), v.to_string()))
                    .collect();
            }
            GraphNode::Failed { errors } => {
                entry.errors = errors
                    .iter()
                    .map(|(registry, e)| GraphEntryError {
                        registry: registry.to_string(),
                        message: e.to_string(),
                    })
                    .collect();
            }
        }
        entry
    }
}
