//! Package reference parsing.
//!
//! Parses references like:
//! - `com.example.pkg`
//! - `com.example.pkg@1.2.0`
//! - `com.example.pkg@latest`
//! - `com.example.pkg@https://github.com/example/pkg.git`

use std::fmt;

use super::error::PkgError;
use super::types::{DomainName, SemanticVersion};

/// What a reference asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionReference {
    /// The `latest` dist-tag (also used when no version is given).
    Latest,
    /// The newest version without a pre-release tag.
    Stable,
    /// An exact published version.
    Exact(SemanticVersion),
    /// A git, http(s), or file URL. Never resolvable against a registry.
    Url(String),
}

impl VersionReference {
    /// Parse the part after `@`.
    ///
    /// # Errors
    /// Returns an error if the input is none of a tag, version, or URL.
    pub fn parse(input: &str) -> Result<Self, PkgError> {
        match input {
            "" => Err(PkgError::spec_invalid("empty version")),
            "latest" => Ok(Self::Latest),
            "stable" => Ok(Self::Stable),
            _ if is_url_version(input) => Ok(Self::Url(input.to_string())),
            _ => SemanticVersion::parse(input).map(Self::Exact).map_err(|_| {
                PkgError::spec_invalid(format!(
                    "'{input}' is not a version, 'latest', 'stable', or a URL (ranges are not supported)"
                ))
            }),
        }
    }

    #[must_use]
    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

impl fmt::Display for VersionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Stable => f.write_str("stable"),
            Self::Exact(v) => write!(f, "{v}"),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Whether a manifest dependency value points at a URL instead of a version.
#[must_use]
pub fn is_url_version(value: &str) -> bool {
    ["http://", "https://", "git+", "git@", "git://", "file:"]
        .iter()
        .any(|prefix| value.starts_with(prefix))
}

/// A parsed `name[@version]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReference {
    pub name: DomainName,
    pub version: VersionReference,
}

impl PackageReference {
    /// Parse a package reference string.
    ///
    /// # Errors
    /// Returns an error if the name or the version part is invalid.
    pub fn parse(input: &str) -> Result<Self, PkgError> {
        let input = input.trim();

        if input.is_empty() {
            return Err(PkgError::spec_invalid("empty package reference"));
        }

        // The name can never contain '@', so the first one splits.
        let (name, version) = match input.split_once('@') {
            Some((name, version)) => (name, Some(version)),
            None => (input, None),
        };

        let name = DomainName::parse(name).map_err(|e| PkgError::spec_invalid(e.to_string()))?;
        let version = match version {
            Some(v) => VersionReference::parse(v)?,
            None => VersionReference::Latest,
        };

        Ok(Self { name, version })
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_only() {
        let r = PackageReference::parse("com.example.pkg").unwrap();
        assert_eq!(r.name.as_str(), "com.example.pkg");
        assert_eq!(r.version, VersionReference::Latest);
    }

    #[test]
    fn test_parse_with_version() {
        let r = PackageReference::parse("com.example.pkg@1.2.0").unwrap();
        assert_eq!(
            r.version,
            VersionReference::Exact(SemanticVersion::parse("1.2.0").unwrap())
        );
        assert_eq!(r.to_string(), "com.example.pkg@1.2.0");
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            PackageReference::parse("com.example.pkg@latest").unwrap().version,
            VersionReference::Latest
        );
        assert_eq!(
            PackageReference::parse("com.example.pkg@stable").unwrap().version,
            VersionReference::Stable
        );
    }

    #[test]
    fn test_parse_url_versions() {
        for url in [
            "https://github.com/example/pkg.git",
            "git+https://github.com/example/pkg.git#v1",
            "git@github.com:example/pkg.git",
            "file:../local/pkg",
        ] {
            let r = PackageReference::parse(&format!("com.example.pkg@{url}")).unwrap();
            assert_eq!(r.version, VersionReference::Url(url.to_string()));
            assert!(r.version.is_url());
        }
    }

    #[test]
    fn test_parse_rejects_ranges() {
        assert!(PackageReference::parse("com.example.pkg@^1.0.0").is_err());
        assert!(PackageReference::parse("com.example.pkg@~1.0.0").is_err());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(PackageReference::parse("").is_err());
        assert!(PackageReference::parse("   ").is_err());
        assert!(PackageReference::parse("com.example.pkg@").is_err());
        assert!(PackageReference::parse("@1.0.0").is_err());
        assert!(PackageReference::parse("Com.Example").is_err());
    }
}
