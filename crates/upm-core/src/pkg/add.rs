//! Adding packages to a project manifest.
//!
//! Each reference is resolved independently. A failing reference does not
//! prevent the others from being added; the manifest is written once at the
//! end, and only when something changed.

use std::path::Path;

use super::cache::PackumentCache;
use super::editor::{check_editor_compatibility, read_project_editor_version, EditorVersion};
use super::env::RegistryEnv;
use super::error::{codes, PkgError, ResolveError};
use super::graph::{DependencyGraph, GraphNode};
use super::manifest::{DependencyChange, UnityProjectManifest};
use super::registry::{PackumentFetcher, Registry, UrlExistenceChecker};
use super::resolve::DependencyResolver;
use super::spec::{PackageReference, VersionReference};
use super::types::{RegistrySource, SemanticVersion};
use super::version::{try_resolve_packument_version, RequestedVersion};

/// Flags of the `add` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddOptions {
    /// Also register the package as testable.
    pub test: bool,
    /// Add despite editor incompatibility or unresolved dependencies.
    pub force: bool,
}

/// Result for one requested reference.
#[derive(Debug)]
pub struct PackageOutcome<T> {
    /// The reference as given on the command line.
    pub reference: String,
    pub result: Result<T, PkgError>,
}

/// A package written to the manifest.
#[derive(Debug, Clone)]
pub struct AddedPackage {
    pub name: String,
    /// Version or URL written to `dependencies`.
    pub version: String,
    pub change: DependencyChange,
    /// `None` for URL references.
    pub source: Option<RegistrySource>,
    /// Scopes newly added to the primary scoped registry.
    pub new_scopes: Vec<String>,
    /// Dependencies that could not be resolved but were forced past.
    pub unresolved: Vec<String>,
}

/// Outcome of an `add` invocation.
#[derive(Debug)]
pub struct AddReport {
    pub packages: Vec<PackageOutcome<AddedPackage>>,
    pub manifest_changed: bool,
}

impl AddReport {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.packages.iter().any(|p| p.result.is_err())
    }
}

/// Add `references` to the manifest of the project at `project_root`.
///
/// # Errors
/// Fails as a whole only when the manifest cannot be loaded or written, or
/// on registry transport errors. Per-package failures are reported in
/// [`AddReport::packages`].
pub async fn add_packages(
    project_root: &Path,
    env: &RegistryEnv,
    fetcher: &dyn PackumentFetcher,
    urls: &dyn UrlExistenceChecker,
    references: &[PackageReference],
    options: AddOptions,
) -> Result<AddReport, PkgError> {
    let original = UnityProjectManifest::load(project_root)?;
    let editor = read_project_editor_version(project_root)?;
    let mut manifest = original.clone();

    let adder = Adder {
        env,
        fetcher,
        urls,
        registries: env.registries(),
        editor,
        options,
    };
    let mut cache = PackumentCache::new();

    let mut packages = Vec::with_capacity(references.len());
    for reference in references {
        match adder.add_one(&mut manifest, &mut cache, reference).await {
            // Transport failures affect every reference alike.
            Err(e) if e.code() == codes::PKG_REGISTRY_ERROR => return Err(e),
            result => packages.push(PackageOutcome {
                reference: reference.to_string(),
                result,
            }),
        }
    }

    let manifest_changed = manifest != original;
    if manifest_changed {
        manifest.save(project_root)?;
    }

    Ok(AddReport {
        packages,
        manifest_changed,
    })
}

struct Adder<'a> {
    env: &'a RegistryEnv,
    fetcher: &'a dyn PackumentFetcher,
    urls: &'a dyn UrlExistenceChecker,
    registries: Vec<Registry>,
    editor: Option<EditorVersion>,
    options: AddOptions,
}

impl Adder<'_> {
    async fn add_one(
        &self,
        manifest: &mut UnityProjectManifest,
        cache: &mut PackumentCache,
        reference: &PackageReference,
    ) -> Result<AddedPackage, PkgError> {
        let name = &reference.name;

        let Some(requested) = RequestedVersion::from_reference(&reference.version) else {
            // URL references cannot be checked against a registry.
            let version = reference.version.to_string();
            let change = manifest.set_dependency(name.as_str(), &version);
            self.mark_testable(manifest, name.as_str());
            return Ok(AddedPackage {
                name: name.to_string(),
                version,
                change,
                source: None,
                new_scopes: Vec::new(),
                unresolved: Vec::new(),
            });
        };

        let version = match self.find_version(cache, reference, &requested).await? {
            Ok(version) => version,
            Err(error) => {
                // Not published at this version; may still be bundled with the editor.
                if let VersionReference::Exact(version) = &reference.version {
                    if self
                        .env
                        .built_in_checker()
                        .is_built_in(self.urls, self.fetcher, cache, name, version)
                        .await?
                    {
                        return Ok(self.write(
                            manifest,
                            reference,
                            version,
                            Some(RegistrySource::BuiltIn),
                            Vec::new(),
                            Vec::new(),
                        ));
                    }
                }
                return Err(error.map_or_else(|| PkgError::not_found(name.as_str()), PkgError::from));
            }
        };

        let resolver =
            DependencyResolver::new(self.fetcher, self.urls, self.env.built_in_checker());
        let graph = resolver
            .resolve_with_cache(cache, &self.registries, name, &version, true)
            .await?;

        let unresolved = unresolved_dependencies(&graph);
        if !unresolved.is_empty() {
            if !self.options.force {
                return Err(PkgError::new(
                    codes::PKG_DEPENDENCY_UNRESOLVED,
                    format!(
                        "{name}@{version} has unresolved dependencies: {}; use --force to add anyway",
                        unresolved.join(", ")
                    ),
                ));
            }
            tracing::warn!(name = %name, unresolved = ?unresolved, "adding despite unresolved dependencies");
        }

        let source = match graph.try_get_node(name, &version) {
            Some(GraphNode::Resolved { source, .. }) => Some(source.clone()),
            _ => None,
        };

        let primary = &self.env.primary.url;
        let scopes: Vec<String> = graph
            .traverse()
            .filter(|(_, _, node)| {
                matches!(node, GraphNode::Resolved { source, .. } if source.is_registry(primary))
            })
            .map(|(dep_name, _, _)| dep_name.to_string())
            .collect();
        let new_scopes = if scopes.is_empty() {
            Vec::new()
        } else {
            let registry = manifest.scoped_registry_mut(&primary.host(), primary);
            scopes
                .into_iter()
                .filter(|scope| registry.add_scope(scope))
                .collect()
        };

        Ok(self.write(manifest, reference, &version, source, new_scopes, unresolved))
    }

    /// Find the first registry whose packument has the requested version,
    /// after checking editor compatibility.
    ///
    /// The inner `Err` carries the first registry's resolve error, or `None`
    /// when no registry knows the package at all.
    async fn find_version(
        &self,
        cache: &mut PackumentCache,
        reference: &PackageReference,
        requested: &RequestedVersion,
    ) -> Result<Result<SemanticVersion, Option<ResolveError>>, PkgError> {
        let name = &reference.name;
        let mut first_error: Option<ResolveError> = None;

        for registry in &self.registries {
            let Some(packument) = cache.get_or_fetch(self.fetcher, registry, name).await? else {
                continue;
            };
            match try_resolve_packument_version(name, &packument, requested) {
                Ok((version, data)) => {
                    if let Some(editor) = &self.editor {
                        if let Err(e) =
                            check_editor_compatibility(name.as_str(), version.as_str(), data, editor)
                        {
                            if !self.options.force {
                                return Err(e);
                            }
                            tracing::warn!(name = %name, error = %e, "adding despite editor incompatibility");
                        }
                    }
                    tracing::debug!(name = %name, version = %version, registry = %registry.url, "version found");
                    return Ok(Ok(version.clone()));
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        Ok(Err(first_error))
    }

    fn write(
        &self,
        manifest: &mut UnityProjectManifest,
        reference: &PackageReference,
        version: &SemanticVersion,
        source: Option<RegistrySource>,
        new_scopes: Vec<String>,
        unresolved: Vec<String>,
    ) -> AddedPackage {
        let name = reference.name.as_str();
        let change = manifest.set_dependency(name, version.as_str());
        self.mark_testable(manifest, name);
        tracing::info!(name, version = %version, change = ?change, "dependency set");
        AddedPackage {
            name: name.to_string(),
            version: version.to_string(),
            change,
            source,
            new_scopes,
            unresolved,
        }
    }

    fn mark_testable(&self, manifest: &mut UnityProjectManifest, name: &str) {
        if self.options.test {
            manifest.add_testable(name);
        }
    }
}

/// `name@version` of every failed node.
fn unresolved_dependencies(graph: &DependencyGraph) -> Vec<String> {
    graph
        .failures()
        .map(|(name, version, _)| format!("{name}@{version}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::{manifest_path, project_version_path, PACKAGES_DIR};
    use crate::pkg::error::RegistryError;
    use crate::pkg::packument::Packument;
    use crate::pkg::types::{DomainName, RegistryUrl};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::fs;

    const PRIMARY: &str = "https://package.openupm.com";
    const UPSTREAM: &str = "https://packages.unity.com";
    const DOCS: &str = "https://docs.unity3d.com";

    #[derive(Default)]
    struct Fake {
        packuments: HashMap<(String, String), String>,
        docs: Vec<String>,
    }

    impl Fake {
        fn publish(mut self, registry: &str, name: &str, json: &str) -> Self {
            self.packuments
                .insert((registry.to_string(), name.to_string()), json.to_string());
            self
        }

        fn document(mut self, name: &str) -> Self {
            self.docs.push(format!("{DOCS}/Manual/{name}.html"));
            self
        }
    }

    #[async_trait]
    impl PackumentFetcher for Fake {
        async fn fetch_packument(
            &self,
            registry: &Registry,
            name: &DomainName,
        ) -> Result<Option<Packument>, RegistryError> {
            Ok(self
                .packuments
                .get(&(registry.url.to_string(), name.to_string()))
                .map(|json| serde_json::from_str(json).unwrap()))
        }
    }

    #[async_trait]
    impl UrlExistenceChecker for Fake {
        async fn url_exists(&self, url: &str) -> Result<bool, RegistryError> {
            Ok(self.docs.iter().any(|d| d == url))
        }
    }

    fn fake() -> Fake {
        Fake::default()
            .publish(
                PRIMARY,
                "com.example.a",
                r#"{"name":"com.example.a","dist-tags":{"latest":"1.1.0"},"versions":{
                    "1.0.0":{"name":"com.example.a","version":"1.0.0"},
                    "1.1.0":{"name":"com.example.a","version":"1.1.0","unity":"2021.3",
                             "dependencies":{"com.example.b":"2.0.0","com.unity.timeline":"1.6.0","com.unity.ugui":"1.0.0"}}}}"#,
            )
            .publish(
                PRIMARY,
                "com.example.b",
                r#"{"name":"com.example.b","versions":{"2.0.0":{"name":"com.example.b","version":"2.0.0"}}}"#,
            )
            .publish(
                PRIMARY,
                "com.example.broken",
                r#"{"name":"com.example.broken","versions":{"1.0.0":{"dependencies":{"com.example.gone":"1.0.0"}}}}"#,
            )
            .publish(
                UPSTREAM,
                "com.unity.timeline",
                r#"{"name":"com.unity.timeline","versions":{"1.6.0":{"name":"com.unity.timeline","version":"1.6.0"}}}"#,
            )
            .publish(
                UPSTREAM,
                "com.unity.textmeshpro",
                r#"{"name":"com.unity.textmeshpro","versions":{"1.0.0":{}}}"#,
            )
            .document("com.unity.ugui")
            .document("com.unity.textmeshpro")
    }

    fn env() -> RegistryEnv {
        let registry = |u: &str| Registry::new(RegistryUrl::parse(u).unwrap());
        RegistryEnv {
            primary: registry(PRIMARY),
            upstream: Some(registry(UPSTREAM)),
            vendor: registry(UPSTREAM),
            docs_base_url: DOCS.to_string(),
        }
    }

    fn project(manifest: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(PACKAGES_DIR)).unwrap();
        fs::write(manifest_path(dir.path()), manifest).unwrap();
        dir
    }

    fn refs(inputs: &[&str]) -> Vec<PackageReference> {
        inputs
            .iter()
            .map(|r| PackageReference::parse(r).unwrap())
            .collect()
    }

    async fn add(dir: &Path, inputs: &[&str], options: AddOptions) -> AddReport {
        let fake = fake();
        add_packages(dir, &env(), &fake, &fake, &refs(inputs), options)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_latest_with_scopes() {
        let dir = project(r#"{"dependencies":{}}"#);
        let report = add(dir.path(), &["com.example.a"], AddOptions::default()).await;

        assert!(report.manifest_changed);
        let added = report.packages[0].result.as_ref().unwrap();
        assert_eq!(added.version, "1.1.0");
        assert_eq!(added.change, DependencyChange::Added);
        assert!(added.unresolved.is_empty());

        let manifest = UnityProjectManifest::load(dir.path()).unwrap();
        assert_eq!(manifest.dependency("com.example.a"), Some("1.1.0"));
        let registry = manifest
            .scoped_registry(&RegistryUrl::parse(PRIMARY).unwrap())
            .unwrap();
        assert_eq!(registry.name, "package.openupm.com");
        // Upstream and built-in dependencies are not scoped.
        assert_eq!(registry.scopes, ["com.example.a", "com.example.b"]);
    }

    #[tokio::test]
    async fn test_add_again_is_unchanged() {
        let dir = project(r#"{"dependencies":{}}"#);
        add(dir.path(), &["com.example.a@1.0.0"], AddOptions::default()).await;
        let report = add(dir.path(), &["com.example.a@1.0.0"], AddOptions::default()).await;

        assert!(!report.manifest_changed);
        let added = report.packages[0].result.as_ref().unwrap();
        assert_eq!(added.change, DependencyChange::Unchanged);
    }

    #[tokio::test]
    async fn test_add_url_reference_skips_resolution() {
        let dir = project(r#"{"dependencies":{}}"#);
        let url = "https://github.com/example/pkg.git#v1";
        let report = add(dir.path(), &[&format!("com.example.git@{url}")], AddOptions::default()).await;

        let added = report.packages[0].result.as_ref().unwrap();
        assert_eq!(added.version, url);
        assert!(added.source.is_none());
        let manifest = UnityProjectManifest::load(dir.path()).unwrap();
        assert!(manifest.scoped_registries.is_empty());
    }

    #[tokio::test]
    async fn test_add_unknown_package_and_version() {
        let dir = project(r#"{"dependencies":{}}"#);
        let report = add(
            dir.path(),
            &["com.example.none", "com.example.a@9.0.0", "com.example.b"],
            AddOptions::default(),
        )
        .await;

        assert!(report.has_errors());
        let error_codes: Vec<Option<&str>> = report
            .packages
            .iter()
            .map(|p| p.result.as_ref().err().map(PkgError::code))
            .collect();
        assert_eq!(
            error_codes,
            [
                Some(codes::PKG_NOT_FOUND),
                Some(codes::PKG_VERSION_NOT_FOUND),
                None
            ]
        );
        // The successful reference is still written.
        let manifest = UnityProjectManifest::load(dir.path()).unwrap();
        assert_eq!(manifest.dependencies.len(), 1);
    }

    #[tokio::test]
    async fn test_add_unresolved_dependency_requires_force() {
        let dir = project(r#"{"dependencies":{}}"#);
        let report = add(dir.path(), &["com.example.broken"], AddOptions::default()).await;
        let err = report.packages[0].result.as_ref().unwrap_err();
        assert_eq!(err.code(), codes::PKG_DEPENDENCY_UNRESOLVED);
        assert!(err.message().contains("com.example.gone@1.0.0"));
        assert!(!report.manifest_changed);

        let forced = AddOptions {
            force: true,
            ..AddOptions::default()
        };
        let report = add(dir.path(), &["com.example.broken"], forced).await;
        let added = report.packages[0].result.as_ref().unwrap();
        assert_eq!(added.unresolved, ["com.example.gone@1.0.0"]);
    }

    #[tokio::test]
    async fn test_add_checks_editor_version() {
        let dir = project(r#"{"dependencies":{}}"#);
        let version_file = project_version_path(dir.path());
        fs::create_dir_all(version_file.parent().unwrap()).unwrap();
        fs::write(&version_file, "m_EditorVersion: 2020.3.1f1\n").unwrap();

        let report = add(dir.path(), &["com.example.a"], AddOptions::default()).await;
        let err = report.packages[0].result.as_ref().unwrap_err();
        assert_eq!(err.code(), codes::PKG_EDITOR_INCOMPATIBLE);

        // 1.0.0 declares no editor requirement.
        let report = add(dir.path(), &["com.example.a@1.0.0"], AddOptions::default()).await;
        assert!(report.packages[0].result.is_ok());
    }

    #[tokio::test]
    async fn test_add_built_in_package() {
        let dir = project(r#"{"dependencies":{}}"#);
        let report = add(dir.path(), &["com.unity.ugui@1.0.0"], AddOptions::default()).await;
        let added = report.packages[0].result.as_ref().unwrap();
        assert_eq!(added.source, Some(RegistrySource::BuiltIn));
    }

    #[tokio::test]
    async fn test_add_built_in_version_missing_from_vendor() {
        let dir = project(r#"{"dependencies":{}}"#);
        let report = add(
            dir.path(),
            &["com.unity.textmeshpro@2.0.0", "com.unity.textmeshpro@1.0.0"],
            AddOptions::default(),
        )
        .await;

        let added = report.packages[0].result.as_ref().unwrap();
        assert_eq!(added.version, "2.0.0");
        assert_eq!(added.source, Some(RegistrySource::BuiltIn));
        assert!(added.new_scopes.is_empty());

        // The published version comes from the vendor registry.
        let added = report.packages[1].result.as_ref().unwrap();
        assert_eq!(
            added.source,
            Some(RegistrySource::Registry(RegistryUrl::parse(UPSTREAM).unwrap()))
        );

        // `deps` classifies the unpublished version the same way.
        let fake = fake();
        let reference = PackageReference::parse("com.unity.textmeshpro@2.0.0").unwrap();
        let deps = crate::pkg::deps::resolve_deps(&env(), &fake, &fake, &reference, true)
            .await
            .unwrap();
        assert!(matches!(
            deps.graph.try_get_node(&deps.name, &deps.version),
            Some(GraphNode::Resolved { source: RegistrySource::BuiltIn, .. })
        ));
    }

    #[tokio::test]
    async fn test_add_undocumented_missing_version_fails() {
        let dir = project(r#"{"dependencies":{}}"#);
        let report = add(dir.path(), &["com.unity.timeline@9.0.0"], AddOptions::default()).await;
        let err = report.packages[0].result.as_ref().unwrap_err();
        assert_eq!(err.code(), codes::PKG_VERSION_NOT_FOUND);
        assert!(err.message().contains("1.6.0"));
    }

    #[tokio::test]
    async fn test_add_testable() {
        let dir = project(r#"{"dependencies":{}}"#);
        let options = AddOptions {
            test: true,
            ..AddOptions::default()
        };
        add(dir.path(), &["com.example.b"], options).await;
        let manifest = UnityProjectManifest::load(dir.path()).unwrap();
        assert_eq!(manifest.testables, ["com.example.b"]);
    }

    #[tokio::test]
    async fn test_add_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let fake = fake();
        let err = add_packages(
            dir.path(),
            &env(),
            &fake,
            &fake,
            &refs(&["com.example.a"]),
            AddOptions::default(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), codes::PKG_MANIFEST_NOT_FOUND);
    }
}
