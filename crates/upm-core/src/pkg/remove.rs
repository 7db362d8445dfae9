//! Removing packages from a project manifest.

use std::path::Path;

use super::add::PackageOutcome;
use super::error::PkgError;
use super::manifest::UnityProjectManifest;
use super::types::DomainName;

/// A dependency taken out of the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedPackage {
    pub name: String,
    /// Version (or URL) the manifest pointed at.
    pub version: String,
}

/// Outcome of a `remove` invocation.
#[derive(Debug)]
pub struct RemoveReport {
    pub packages: Vec<PackageOutcome<RemovedPackage>>,
    pub manifest_changed: bool,
}

impl RemoveReport {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.packages.iter().any(|p| p.result.is_err())
    }
}

/// Remove `names` from the dependencies, scopes, and testables of the
/// project at `project_root`.
///
/// # Errors
/// Fails as a whole only when the manifest cannot be loaded or written.
/// Names missing from the manifest are reported per package as
/// `PKG_NOT_INSTALLED`.
pub fn remove_packages(project_root: &Path, names: &[DomainName]) -> Result<RemoveReport, PkgError> {
    let original = UnityProjectManifest::load(project_root)?;
    let mut manifest = original.clone();

    let packages = names
        .iter()
        .map(|name| PackageOutcome {
            reference: name.to_string(),
            result: remove_one(&mut manifest, name.as_str()),
        })
        .collect();

    let manifest_changed = manifest != original;
    if manifest_changed {
        manifest.save(project_root)?;
    }

    Ok(RemoveReport {
        packages,
        manifest_changed,
    })
}

fn remove_one(manifest: &mut UnityProjectManifest, name: &str) -> Result<RemovedPackage, PkgError> {
    let version = manifest
        .remove_dependency(name)
        .ok_or_else(|| PkgError::not_installed(name))?;
    manifest.remove_scope(name);
    manifest.remove_testable(name);
    tracing::info!(name, version = %version, "dependency removed");

    Ok(RemovedPackage {
        name: name.to_string(),
        version,
    })
}
