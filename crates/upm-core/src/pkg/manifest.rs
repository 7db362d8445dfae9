//! Project manifest (`Packages/manifest.json`) model and editing.
//!
//! Unknown top-level keys and unknown scoped-registry keys are kept, in their
//! original order, so that a rewrite only touches what the commands change.
//! `dependencies` is written sorted by name, as the editor writes it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use super::error::PkgError;
use super::types::RegistryUrl;
use crate::paths::manifest_path;

/// The project manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnityProjectManifest {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scoped_registries: Vec<ScopedRegistry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub testables: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A `scopedRegistries` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedRegistry {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScopedRegistry {
    #[must_use]
    pub fn new(name: impl Into<String>, url: &RegistryUrl) -> Self {
        Self {
            name: name.into(),
            url: url.to_string(),
            scopes: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Whether the entry points at `url`, ignoring a trailing slash.
    #[must_use]
    pub fn points_to(&self, url: &RegistryUrl) -> bool {
        RegistryUrl::parse(&self.url).is_ok_and(|u| &u == url)
    }

    /// Add a scope, keeping the list sorted and unique. Returns whether it was
    /// new.
    pub fn add_scope(&mut self, scope: &str) -> bool {
        if self.scopes.iter().any(|s| s == scope) {
            return false;
        }
        self.scopes.push(scope.to_string());
        self.scopes.sort();
        self.scopes.dedup();
        true
    }
}

/// Effect of setting a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyChange {
    Added,
    Modified { previous: String },
    Unchanged,
}

impl UnityProjectManifest {
    /// Parse manifest JSON.
    ///
    /// # Errors
    /// Returns `PKG_MANIFEST_INVALID` for malformed JSON.
    pub fn parse(content: &str) -> Result<Self, PkgError> {
        serde_json::from_str(content)
            .map_err(|e| PkgError::manifest_invalid(format!("invalid manifest.json: {e}")))
    }

    /// Load the manifest of the project at `project_root`.
    ///
    /// # Errors
    /// `PKG_MANIFEST_NOT_FOUND` when the file is missing, `PKG_MANIFEST_INVALID`
    /// when it cannot be read or parsed.
    pub fn load(project_root: &Path) -> Result<Self, PkgError> {
        let path = manifest_path(project_root);
        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PkgError::manifest_not_found(&path))
            }
            Err(e) => Err(PkgError::manifest_invalid(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Serialize as pretty JSON with a trailing newline.
    ///
    /// # Errors
    /// Returns `PKG_MANIFEST_WRITE_FAILED` if serialization fails.
    pub fn to_json(&self) -> Result<String, PkgError> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| PkgError::manifest_write_failed(e.to_string()))?;
        json.push('\n');
        Ok(json)
    }

    /// Write the manifest atomically to the project at `project_root`.
    ///
    /// # Errors
    /// Returns `PKG_MANIFEST_WRITE_FAILED` on any I/O failure.
    pub fn save(&self, project_root: &Path) -> Result<(), PkgError> {
        let path = manifest_path(project_root);
        let json = self.to_json()?;
        let dir = path.parent().unwrap_or(project_root);

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| {
            PkgError::manifest_write_failed(format!("failed to write {}: {e}", path.display()))
        })?;

        tracing::info!(path = %path.display(), "manifest written");
        Ok(())
    }

    /// Set `dependencies[name] = version`.
    pub fn set_dependency(&mut self, name: &str, version: &str) -> DependencyChange {
        match self.dependencies.insert(name.to_string(), version.to_string()) {
            None => DependencyChange::Added,
            Some(previous) if previous == version => DependencyChange::Unchanged,
            Some(previous) => DependencyChange::Modified { previous },
        }
    }

    /// Remove a dependency, returning its previous version.
    pub fn remove_dependency(&mut self, name: &str) -> Option<String> {
        self.dependencies.remove(name)
    }

    #[must_use]
    pub fn dependency(&self, name: &str) -> Option<&str> {
        self.dependencies.get(name).map(String::as_str)
    }

    /// The scoped registry pointing at `url`, created with `name` if missing.
    pub fn scoped_registry_mut(&mut self, name: &str, url: &RegistryUrl) -> &mut ScopedRegistry {
        let index = match self.scoped_registries.iter().position(|r| r.points_to(url)) {
            Some(index) => index,
            None => {
                self.scoped_registries.push(ScopedRegistry::new(name, url));
                self.scoped_registries.len() - 1
            }
        };
        &mut self.scoped_registries[index]
    }

    #[must_use]
    pub fn scoped_registry(&self, url: &RegistryUrl) -> Option<&ScopedRegistry> {
        self.scoped_registries.iter().find(|r| r.points_to(url))
    }

    /// Drop `scope` from every scoped registry.
    pub fn remove_scope(&mut self, scope: &str) {
        for registry in &mut self.scoped_registries {
            registry.scopes.retain(|s| s != scope);
        }
    }

    /// Add a testable, keeping the list sorted and unique.
    pub fn add_testable(&mut self, name: &str) {
        if !self.testables.iter().any(|t| t == name) {
            self.testables.push(name.to_string());
            self.testables.sort();
        }
    }

    pub fn remove_testable(&mut self, name: &str) {
        self.testables.retain(|t| t != name);
    }
}
