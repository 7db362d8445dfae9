//! Package manager functionality.
//!
//! Provides utilities for:
//! - Parsing package references (name@version, tags, URLs)
//! - Fetching packuments from npm-compatible registries
//! - Resolving `latest`/`stable`/exact versions against a packument
//! - Detecting packages bundled with the editor
//! - Building dependency graphs across prioritized registries
//! - Rendering dependency trees
//! - Editing the project manifest (`add`, `remove`)

pub mod add;
pub mod builtin;
pub mod cache;
pub mod deps;
pub mod editor;
pub mod env;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod packument;
pub mod registry;
pub mod remove;
pub mod render;
pub mod resolve;
pub mod spec;
pub mod types;
pub mod upmconfig;
pub mod version;

pub use add::{add_packages, AddOptions, AddReport, AddedPackage, PackageOutcome};
pub use builtin::BuiltInPackageChecker;
pub use cache::PackumentCache;
pub use deps::{resolve_deps, DepsJson, DepsResult};
pub use editor::{check_editor_compatibility, read_project_editor_version, EditorVersion};
pub use env::{RegistryEnv, RegistryEnvOptions};
pub use error::{codes as pkg_codes, PkgError, RegistryError, ResolveError};
pub use graph::{DependencyGraph, GraphEntry, GraphNode, DEPS_GRAPH_SCHEMA_VERSION};
pub use manifest::{DependencyChange, ScopedRegistry, UnityProjectManifest};
pub use packument::{Packument, PackumentVersion};
pub use registry::{
    PackumentFetcher, Registry, RegistryClient, UrlExistenceChecker, DEFAULT_REGISTRY,
    REGISTRY_ENV, UNITY_REGISTRY,
};
pub use remove::{remove_packages, RemoveReport, RemovedPackage};
pub use render::{render_graph, RenderError};
pub use resolve::DependencyResolver;
pub use spec::{PackageReference, VersionReference};
pub use types::{DomainName, RegistrySource, RegistryUrl, SemanticVersion};
pub use upmconfig::{user_config_path, NpmAuth, UpmConfig};
pub use version::{try_resolve_packument_version, RequestedVersion};
