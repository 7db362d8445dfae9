//! Dependency graph resolution across prioritized registries.
//!
//! Resolution is iterative: starting from a seed graph, the resolver picks an
//! unresolved `(name, version)` pair, settles it, and repeats until nothing
//! is left to process. Registries are tried sequentially so that the first
//! registry in the list always wins when several could serve a package.

use std::collections::BTreeMap;

use super::builtin::BuiltInPackageChecker;
use super::cache::PackumentCache;
use super::error::{RegistryError, ResolveError};
use super::graph::DependencyGraph;
use super::registry::{PackumentFetcher, Registry, UrlExistenceChecker};
use super::types::{DomainName, RegistryUrl, SemanticVersion};
use super::version::{try_resolve_packument_version, RequestedVersion};

/// Builds dependency graphs. Holds no per-call state.
pub struct DependencyResolver<'a> {
    fetcher: &'a dyn PackumentFetcher,
    urls: &'a dyn UrlExistenceChecker,
    built_in: BuiltInPackageChecker,
}

/// Outcome of trying every registry for one pair.
enum Attempt {
    Matched {
        registry: RegistryUrl,
        dependencies: BTreeMap<DomainName, SemanticVersion>,
    },
    Failed(BTreeMap<RegistryUrl, ResolveError>),
}

impl<'a> DependencyResolver<'a> {
    #[must_use]
    pub fn new(
        fetcher: &'a dyn PackumentFetcher,
        urls: &'a dyn UrlExistenceChecker,
        built_in: BuiltInPackageChecker,
    ) -> Self {
        Self {
            fetcher,
            urls,
            built_in,
        }
    }

    /// Resolve the dependency graph of `name@version`.
    ///
    /// With `deep`, every reachable pair is resolved. Without it only the
    /// seed is resolved and its direct dependencies are left as unresolved
    /// placeholders.
    ///
    /// # Errors
    /// Transport or auth failures from any registry abort the call. Packages
    /// that cannot be found end up as failed nodes instead.
    pub async fn resolve(
        &self,
        registries: &[Registry],
        name: &DomainName,
        version: &SemanticVersion,
        deep: bool,
    ) -> Result<DependencyGraph, RegistryError> {
        let mut cache = PackumentCache::new();
        self.resolve_with_cache(&mut cache, registries, name, version, deep)
            .await
    }

    /// Like [`Self::resolve`], reusing packuments the caller already fetched.
    ///
    /// # Errors
    /// See [`Self::resolve`].
    pub async fn resolve_with_cache(
        &self,
        cache: &mut PackumentCache,
        registries: &[Registry],
        name: &DomainName,
        version: &SemanticVersion,
        deep: bool,
    ) -> Result<DependencyGraph, RegistryError> {
        let mut graph = DependencyGraph::from_seed(name.clone(), version.clone());

        while let Some((pkg_name, pkg_version)) = next_pair(&graph, name, version, deep) {
            if self
                .built_in
                .is_built_in(self.urls, self.fetcher, cache, &pkg_name, &pkg_version)
                .await?
            {
                graph = graph.mark_built_in_resolved(pkg_name, pkg_version);
                continue;
            }

            graph = match self
                .try_registries(cache, registries, &pkg_name, &pkg_version)
                .await?
            {
                Attempt::Matched {
                    registry,
                    dependencies,
                } => graph.mark_remote_resolved(pkg_name, pkg_version, registry, dependencies),
                Attempt::Failed(errors) => graph.mark_failed(pkg_name, pkg_version, errors),
            };
        }

        tracing::debug!(
            name = %name,
            version = %version,
            deep,
            nodes = graph.node_count(),
            "dependency graph resolved"
        );
        Ok(graph)
    }

    async fn try_registries(
        &self,
        cache: &mut PackumentCache,
        registries: &[Registry],
        name: &DomainName,
        version: &SemanticVersion,
    ) -> Result<Attempt, RegistryError> {
        let requested = RequestedVersion::Exact(version.clone());
        let mut errors = BTreeMap::new();

        for registry in registries {
            let Some(packument) = cache.get_or_fetch(self.fetcher, registry, name).await? else {
                errors.insert(
                    registry.url.clone(),
                    ResolveError::PackumentNotFound { name: name.clone() },
                );
                continue;
            };

            match try_resolve_packument_version(name, &packument, &requested) {
                Ok((_, data)) => {
                    return Ok(Attempt::Matched {
                        registry: registry.url.clone(),
                        dependencies: data.dependencies.clone(),
                    });
                }
                Err(e) => {
                    errors.insert(registry.url.clone(), e);
                }
            }
        }

        Ok(Attempt::Failed(errors))
    }
}

fn next_pair(
    graph: &DependencyGraph,
    seed_name: &DomainName,
    seed_version: &SemanticVersion,
    deep: bool,
) -> Option<(DomainName, SemanticVersion)> {
    if deep {
        return graph
            .try_get_next_unresolved()
            .map(|(name, version)| (name.clone(), version.clone()));
    }
    graph
        .try_get_node(seed_name, seed_version)
        .is_some_and(super::graph::GraphNode::is_unresolved)
        .then(|| (seed_name.clone(), seed_version.clone()))
}
