//! Validated primitive types: package names, versions, registry URLs.

use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Sentinel used for packages bundled with the editor.
pub const BUILT_IN_SOURCE: &str = "built-in";

/// A primitive failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidValue {
    #[error("'{0}' is not a valid package name")]
    DomainName(String),
    #[error("'{0}' is not a valid semantic version")]
    SemanticVersion(String),
    #[error("'{0}' is not a valid registry URL")]
    RegistryUrl(String),
}

/// Reverse-DNS package identifier, e.g. `com.unity.textmeshpro`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DomainName(String);

impl DomainName {
    /// Validate and wrap a package name.
    ///
    /// # Errors
    /// Returns an error if any `.`-separated segment is empty, contains
    /// characters outside `[a-z0-9_-]`, or starts/ends with `-` or `_`.
    pub fn parse(input: &str) -> Result<Self, InvalidValue> {
        if Self::is_valid(input) {
            Ok(Self(input.to_string()))
        } else {
            Err(InvalidValue::DomainName(input.to_string()))
        }
    }

    /// Check a string without allocating.
    #[must_use]
    pub fn is_valid(input: &str) -> bool {
        !input.is_empty()
            && input.split('.').all(|segment| {
                let bytes = segment.as_bytes();
                match (bytes.first(), bytes.last()) {
                    (Some(first), Some(last)) => {
                        first.is_ascii_alphanumeric()
                            && last.is_ascii_alphanumeric()
                            && bytes.iter().all(|b| {
                                b.is_ascii_lowercase()
                                    || b.is_ascii_digit()
                                    || *b == b'-'
                                    || *b == b'_'
                            })
                    }
                    _ => false,
                }
            })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DomainName {
    type Error = InvalidValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidValue::DomainName(value))
        }
    }
}

impl From<DomainName> for String {
    fn from(value: DomainName) -> Self {
        value.0
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A semver 2.0 version string. The original spelling is kept so that
/// lookups against registry documents stay exact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SemanticVersion(String);

impl SemanticVersion {
    /// Validate and wrap a version string.
    ///
    /// # Errors
    /// Returns an error if the string is not a semver 2.0 version.
    pub fn parse(input: &str) -> Result<Self, InvalidValue> {
        semver::Version::parse(input)
            .map(|_| Self(input.to_string()))
            .map_err(|_| InvalidValue::SemanticVersion(input.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parsed form. Always succeeds for a constructed value.
    #[must_use]
    pub fn to_semver(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.0).ok()
    }

    /// Whether the version carries a pre-release tag (`1.0.0-beta`).
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.to_semver().is_some_and(|v| !v.pre.is_empty())
    }

    /// Order by semver precedence rather than by string.
    #[must_use]
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        match (self.to_semver(), other.to_semver()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.0.cmp(&other.0),
        }
    }
}

impl TryFrom<String> for SemanticVersion {
    type Error = InvalidValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SemanticVersion> for String {
    fn from(value: SemanticVersion) -> Self {
        value.0
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sort versions ascending by semver precedence.
pub fn sort_versions(versions: &mut [SemanticVersion]) {
    versions.sort_by(SemanticVersion::cmp_precedence);
}

/// Absolute http(s) registry URL without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistryUrl(String);

impl RegistryUrl {
    /// Validate and normalise a registry URL.
    ///
    /// # Errors
    /// Returns an error if the URL does not parse or is not http(s).
    pub fn parse(input: &str) -> Result<Self, InvalidValue> {
        let trimmed = input.trim().trim_end_matches('/');
        match Url::parse(trimmed) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
                Ok(Self(trimmed.to_string()))
            }
            _ => Err(InvalidValue::RegistryUrl(input.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host name, used as the display name of a scoped registry.
    #[must_use]
    pub fn host(&self) -> String {
        Url::parse(&self.0)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .unwrap_or_else(|| self.0.clone())
    }

    /// URL of the packument document for `name`.
    #[must_use]
    pub fn packument_url(&self, name: &DomainName) -> String {
        format!("{}/{}", self.0, name)
    }
}

impl TryFrom<String> for RegistryUrl {
    type Error = InvalidValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RegistryUrl> for String {
    fn from(value: RegistryUrl) -> Self {
        value.0
    }
}

impl fmt::Display for RegistryUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a resolved package came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RegistrySource {
    Registry(RegistryUrl),
    BuiltIn,
}

impl RegistrySource {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Registry(url) => url.as_str(),
            Self::BuiltIn => BUILT_IN_SOURCE,
        }
    }

    /// Whether this source is the given registry.
    #[must_use]
    pub fn is_registry(&self, url: &RegistryUrl) -> bool {
        matches!(self, Self::Registry(u) if u == url)
    }
}

impl fmt::Display for RegistrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RegistrySource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
