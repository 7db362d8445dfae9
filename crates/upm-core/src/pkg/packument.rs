//! Packument (package document) model.
//!
//! Registry documents are deserialized into typed structs. The `versions`
//! object keeps the document's key order, which the `latest` fallback relies
//! on.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

use super::types::{DomainName, SemanticVersion};

/// Package metadata as served by an npm-compatible registry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Packument {
    /// Package name as reported by the registry.
    #[serde(default)]
    pub name: String,
    /// Published versions in document order.
    #[serde(default, deserialize_with = "deserialize_ordered_versions")]
    pub versions: Vec<(SemanticVersion, PackumentVersion)>,
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: DistTags,
    /// Legacy top-level version field, used by some older registries.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// The `dist-tags` object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistTags {
    #[serde(default)]
    pub latest: Option<String>,
}

/// A single published version of a package.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackumentVersion {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Registry dependencies. Pairs that are not a valid name and exact
    /// version (ranges, URLs) are dropped.
    #[serde(default, deserialize_with = "deserialize_dependencies")]
    pub dependencies: BTreeMap<DomainName, SemanticVersion>,
    /// Minimum editor version, e.g. `2020.3`.
    #[serde(default)]
    pub unity: Option<String>,
    /// Minimum editor release within `unity`, e.g. `0f1`.
    #[serde(default)]
    pub unity_release: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dist: Option<Dist>,
}

/// Distribution metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dist {
    #[serde(default)]
    pub tarball: Option<String>,
    #[serde(default)]
    pub shasum: Option<String>,
    #[serde(default)]
    pub integrity: Option<String>,
}

impl Packument {
    /// Look up an exact version.
    #[must_use]
    pub fn get(&self, version: &SemanticVersion) -> Option<&PackumentVersion> {
        self.versions
            .iter()
            .find(|(v, _)| v == version)
            .map(|(_, data)| data)
    }

    /// Look up a version by its raw string form.
    #[must_use]
    pub fn get_str(&self, version: &str) -> Option<(&SemanticVersion, &PackumentVersion)> {
        self.versions
            .iter()
            .find(|(v, _)| v.as_str() == version)
            .map(|(v, data)| (v, data))
    }

    #[must_use]
    pub fn has_version(&self, version: &SemanticVersion) -> bool {
        self.get(version).is_some()
    }

    /// All published version keys, in document order.
    pub fn version_keys(&self) -> impl Iterator<Item = &SemanticVersion> {
        self.versions.iter().map(|(v, _)| v)
    }
}

fn deserialize_dependencies<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<DomainName, SemanticVersion>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    let mut dependencies = BTreeMap::new();
    for (name, version) in raw.unwrap_or_default() {
        let parsed = version.as_str().and_then(|v| {
            let name = DomainName::parse(&name).ok()?;
            let version = SemanticVersion::parse(v).ok()?;
            Some((name, version))
        });
        match parsed {
            Some((name, version)) => {
                dependencies.insert(name, version);
            }
            None => {
                tracing::debug!(dependency = %name, version = %version, "skipping unsupported dependency");
            }
        }
    }
    Ok(dependencies)
}

/// Deserialize the `versions` object into an ordered list.
///
/// Entries whose key is not a semantic version, or whose body does not
/// match [`PackumentVersion`], are skipped rather than failing the whole
/// document.
fn deserialize_ordered_versions<'de, D>(
    deserializer: D,
) -> Result<Vec<(SemanticVersion, PackumentVersion)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedVersions;

    impl<'de> Visitor<'de> for OrderedVersions {
        type Value = Vec<(SemanticVersion, PackumentVersion)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of version strings to version metadata")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut versions = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
                let Ok(version) = SemanticVersion::parse(&key) else {
                    tracing::debug!(version = %key, "skipping non-semver packument entry");
                    continue;
                };
                match serde_json::from_value::<PackumentVersion>(value) {
                    Ok(data) => versions.push((version, data)),
                    Err(e) => {
                        tracing::debug!(version = %key, error = %e, "skipping malformed packument entry");
                    }
                }
            }
            Ok(versions)
        }
    }

    deserializer.deserialize_map(OrderedVersions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::version::{try_resolve_packument_version, RequestedVersion};

    #[test]
    fn test_versions_keep_document_order() {
        let packument: Packument = serde_json::from_str(
            r#"{
                "name": "com.example.a",
                "versions": {
                    "2.0.0": {"name": "com.example.a", "version": "2.0.0"},
                    "1.0.0": {"name": "com.example.a", "version": "1.0.0"},
                    "1.5.0": {"name": "com.example.a", "version": "1.5.0"}
                }
            }"#,
        )
        .unwrap();

        let keys: Vec<&str> = packument.version_keys().map(SemanticVersion::as_str).collect();
        assert_eq!(keys, ["2.0.0", "1.0.0", "1.5.0"]);
    }

    #[test]
    fn test_version_fields() {
        let packument: Packument = serde_json::from_str(
            r#"{
                "name": "com.example.a",
                "dist-tags": {"latest": "1.0.0"},
                "versions": {
                    "1.0.0": {
                        "name": "com.example.a",
                        "version": "1.0.0",
                        "unity": "2020.3",
                        "unityRelease": "0f1",
                        "displayName": "Example",
                        "dependencies": {"com.example.b": "2.1.0"},
                        "dist": {"tarball": "https://example.com/a-1.0.0.tgz"}
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(packument.dist_tags.latest.as_deref(), Some("1.0.0"));
        let version = SemanticVersion::parse("1.0.0").unwrap();
        let data = packument.get(&version).unwrap();
        assert_eq!(data.unity.as_deref(), Some("2020.3"));
        assert_eq!(data.unity_release.as_deref(), Some("0f1"));
        assert_eq!(data.display_name.as_deref(), Some("Example"));
        assert_eq!(data.dependencies.len(), 1);
        assert!(data.dist.as_ref().unwrap().tarball.is_some());
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let packument: Packument = serde_json::from_str(
            r#"{
                "name": "com.example.a",
                "versions": {
                    "not-a-version": {},
                    "1.0.0": {"unity": 2020},
                    "2.0.0": {"dependencies": {"com.example.b": "1.0.0"}}
                }
            }"#,
        )
        .unwrap();

        let keys: Vec<&str> = packument.version_keys().map(SemanticVersion::as_str).collect();
        assert_eq!(keys, ["2.0.0"]);
    }

    #[test]
    fn test_unsupported_dependencies_keep_version() {
        let packument: Packument = serde_json::from_str(
            r#"{
                "name": "com.example.a",
                "versions": {
                    "1.0.0": {},
                    "1.1.0": {},
                    "1.2.0": {"dependencies": {
                        "com.example.b": "1.0",
                        "com.example.c": "https://github.com/example/c.git",
                        "Bad Name": "1.0.0",
                        "com.example.d": 3,
                        "com.example.e": "2.0.0"
                    }}
                }
            }"#,
        )
        .unwrap();

        let keys: Vec<&str> = packument.version_keys().map(SemanticVersion::as_str).collect();
        assert_eq!(keys, ["1.0.0", "1.1.0", "1.2.0"]);

        let name = DomainName::parse("com.example.a").unwrap();
        let (version, data) = try_resolve_packument_version(
            &name,
            &packument,
            &RequestedVersion::Exact(SemanticVersion::parse("1.2.0").unwrap()),
        )
        .unwrap();
        assert_eq!(version.as_str(), "1.2.0");
        let deps: Vec<(&str, &str)> = data
            .dependencies
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .collect();
        assert_eq!(deps, [("com.example.e", "2.0.0")]);
    }

    #[test]
    fn test_null_dependencies() {
        let packument: Packument = serde_json::from_str(
            r#"{"name": "com.example.a", "versions": {"1.0.0": {"dependencies": null}}}"#,
        )
        .unwrap();
        assert_eq!(packument.versions.len(), 1);
        assert!(packument.versions[0].1.dependencies.is_empty());
    }

    #[test]
    fn test_missing_versions_is_empty() {
        let packument: Packument = serde_json::from_str(r#"{"name": "com.example.a"}"#).unwrap();
        assert!(packument.versions.is_empty());
    }
}
