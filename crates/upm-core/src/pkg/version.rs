//! Version resolution against a packument.

use super::error::ResolveError;
use super::packument::{Packument, PackumentVersion};
use super::spec::VersionReference;
use super::types::{sort_versions, DomainName, SemanticVersion};

/// A version request that can be answered by a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedVersion {
    Latest,
    Stable,
    Exact(SemanticVersion),
}

impl RequestedVersion {
    /// Convert a parsed reference. URL references have no registry form.
    #[must_use]
    pub fn from_reference(reference: &VersionReference) -> Option<Self> {
        match reference {
            VersionReference::Latest => Some(Self::Latest),
            VersionReference::Stable => Some(Self::Stable),
            VersionReference::Exact(v) => Some(Self::Exact(v.clone())),
            VersionReference::Url(_) => None,
        }
    }
}

/// Resolve a version request against a packument.
///
/// # Rules
/// - No versions at all: [`ResolveError::NoVersions`].
/// - `Latest`: `dist-tags.latest` if present in `versions`, else the legacy
///   top-level `version` field, else the last entry in document order.
/// - `Stable`: the `Latest` pick unless it is a pre-release, else the
///   highest non-pre-release version, else the `Latest` pick.
/// - `Exact`: exact key match or [`ResolveError::VersionNotFound`] with the
///   available versions sorted ascending.
///
/// # Errors
/// See rules above.
pub fn try_resolve_packument_version<'a>(
    name: &DomainName,
    packument: &'a Packument,
    requested: &RequestedVersion,
) -> Result<(&'a SemanticVersion, &'a PackumentVersion), ResolveError> {
    let no_versions = || ResolveError::NoVersions { name: name.clone() };
    if packument.versions.is_empty() {
        return Err(no_versions());
    }

    match requested {
        RequestedVersion::Latest => latest(packument).ok_or_else(no_versions),
        RequestedVersion::Stable => stable(packument).ok_or_else(no_versions),
        RequestedVersion::Exact(version) => packument
            .versions
            .iter()
            .find(|(v, _)| v == version)
            .map(|(v, data)| (v, data))
            .ok_or_else(|| ResolveError::VersionNotFound {
                name: name.clone(),
                requested: version.clone(),
                available: available_versions(packument),
            }),
    }
}

/// All versions of a packument, sorted ascending by semver precedence.
#[must_use]
pub fn available_versions(packument: &Packument) -> Vec<SemanticVersion> {
    let mut versions: Vec<SemanticVersion> = packument.version_keys().cloned().collect();
    sort_versions(&mut versions);
    versions
}

fn latest(packument: &Packument) -> Option<(&SemanticVersion, &PackumentVersion)> {
    let tagged = packument
        .dist_tags
        .latest
        .as_deref()
        .and_then(|v| packument.get_str(v));
    let legacy = || packument.version.as_deref().and_then(|v| packument.get_str(v));
    let last = || packument.versions.last().map(|(v, data)| (v, data));

    tagged.or_else(legacy).or_else(last)
}

fn stable(packument: &Packument) -> Option<(&SemanticVersion, &PackumentVersion)> {
    let pick = latest(packument)?;
    if !pick.0.is_prerelease() {
        return Some(pick);
    }
    let newest_stable = packument
        .versions
        .iter()
        .filter(|(v, _)| !v.is_prerelease())
        .max_by(|(a, _), (b, _)| a.cmp_precedence(b))
        .map(|(v, data)| (v, data));
    Some(newest_stable.unwrap_or(pick))
}
