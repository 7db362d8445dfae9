//! Dependency listing for a single package reference.

use serde::Serialize;

use super::cache::PackumentCache;
use super::env::RegistryEnv;
use super::error::{PkgError, ResolveError};
use super::graph::{DependencyGraph, GraphEntry, DEPS_GRAPH_SCHEMA_VERSION};
use super::registry::{PackumentFetcher, UrlExistenceChecker};
use super::render::render_graph;
use super::resolve::DependencyResolver;
use super::spec::{PackageReference, VersionReference};
use super::types::{DomainName, SemanticVersion};
use super::version::{try_resolve_packument_version, RequestedVersion};

/// A resolved dependency graph together with its root.
#[derive(Debug, Clone)]
pub struct DepsResult {
    pub name: DomainName,
    pub version: SemanticVersion,
    pub graph: DependencyGraph,
}

/// JSON form of [`DepsResult`].
#[derive(Debug, Serialize)]
pub struct DepsJson {
    pub ok: bool,
    pub schema_version: u32,
    pub root: String,
    pub graph: Vec<GraphEntry>,
}

impl DepsResult {
    /// Tree lines, see [`render_graph`].
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        // The root is always part of its own graph.
        render_graph(&self.graph, &self.name, &self.version).unwrap_or_default()
    }

    #[must_use]
    pub fn to_json(&self) -> DepsJson {
        DepsJson {
            ok: true,
            schema_version: DEPS_GRAPH_SCHEMA_VERSION,
            root: format!("{}@{}", self.name, self.version),
            graph: self.graph.to_entries(),
        }
    }
}

/// Resolve the dependencies of `reference`.
///
/// `latest` and `stable` are first turned into a concrete version using the
/// first registry that knows the package.
///
/// # Errors
/// `PKG_SPEC_INVALID` for URL references, `PKG_NOT_FOUND` /
/// `PKG_VERSION_NOT_FOUND` when a tag cannot be resolved, and
/// `PKG_REGISTRY_ERROR` on transport failures.
pub async fn resolve_deps(
    env: &RegistryEnv,
    fetcher: &dyn PackumentFetcher,
    urls: &dyn UrlExistenceChecker,
    reference: &PackageReference,
    deep: bool,
) -> Result<DepsResult, PkgError> {
    let name = &reference.name;
    let registries = env.registries();
    let mut cache = PackumentCache::new();

    let version = match &reference.version {
        VersionReference::Url(url) => {
            return Err(PkgError::spec_invalid(format!(
                "cannot resolve dependencies of {name}: '{url}' is a URL, not a registry version"
            )));
        }
        VersionReference::Exact(version) => version.clone(),
        tag => {
            let requested = RequestedVersion::from_reference(tag)
                .ok_or_else(|| PkgError::spec_invalid(format!("unsupported version {tag}")))?;
            let mut resolved = None;
            for registry in &registries {
                if let Some(packument) = cache.get_or_fetch(fetcher, registry, name).await? {
                    let (version, _) = try_resolve_packument_version(name, &packument, &requested)?;
                    resolved = Some(version.clone());
                    break;
                }
            }
            resolved.ok_or(ResolveError::PackumentNotFound { name: name.clone() })?
        }
    };

    tracing::debug!(name = %name, version = %version, deep, "resolving dependencies");
    let resolver = DependencyResolver::new(fetcher, urls, env.built_in_checker());
    let graph = resolver
        .resolve_with_cache(&mut cache, &registries, name, &version, deep)
        .await?;

    Ok(DepsResult {
        name: name.clone(),
        version,
        graph,
    })
}
