//! Package manager error types.
//!
//! Three layers:
//! - [`ResolveError`]: domain failures captured per registry inside a failed
//!   graph node. Never thrown during traversal.
//! - [`RegistryError`]: transport/auth failures. These abort a resolve call.
//! - [`PkgError`]: coded, command-level errors surfaced to the CLI.

use std::fmt;
use std::io;
use thiserror::Error;

use super::types::{DomainName, SemanticVersion};

/// Package manager error codes.
pub mod codes {
    pub const PKG_SPEC_INVALID: &str = "PKG_SPEC_INVALID";
    pub const PKG_NOT_FOUND: &str = "PKG_NOT_FOUND";
    pub const PKG_VERSION_NOT_FOUND: &str = "PKG_VERSION_NOT_FOUND";
    pub const PKG_NO_VERSIONS: &str = "PKG_NO_VERSIONS";
    pub const PKG_REGISTRY_ERROR: &str = "PKG_REGISTRY_ERROR";
    pub const PKG_MANIFEST_NOT_FOUND: &str = "PKG_MANIFEST_NOT_FOUND";
    pub const PKG_MANIFEST_INVALID: &str = "PKG_MANIFEST_INVALID";
    pub const PKG_MANIFEST_WRITE_FAILED: &str = "PKG_MANIFEST_WRITE_FAILED";
    pub const PKG_DEPENDENCY_UNRESOLVED: &str = "PKG_DEPENDENCY_UNRESOLVED";
    pub const PKG_EDITOR_INCOMPATIBLE: &str = "PKG_EDITOR_INCOMPATIBLE";
    pub const PKG_NOT_INSTALLED: &str = "PKG_NOT_INSTALLED";
    pub const PKG_CONFIG_INVALID: &str = "PKG_CONFIG_INVALID";
    pub const PKG_TIMEOUT: &str = "PKG_TIMEOUT";
}

/// Why a single registry could not resolve a `(name, version)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The registry has no packument for the name.
    #[error("package {name} not found")]
    PackumentNotFound { name: DomainName },

    /// The packument exists but the requested version does not.
    #[error("version {requested} of {name} not found (available: {})", join_versions(.available))]
    VersionNotFound {
        name: DomainName,
        requested: SemanticVersion,
        /// Sorted ascending.
        available: Vec<SemanticVersion>,
    },

    /// The packument exists but lists zero versions.
    #[error("package {name} has no published versions")]
    NoVersions { name: DomainName },
}

impl ResolveError {
    /// Short message used when rendering failed graph nodes.
    #[must_use]
    pub fn summary(&self) -> &'static str {
        match self {
            Self::PackumentNotFound { .. } => "package not found",
            Self::VersionNotFound { .. } => "version not found",
            Self::NoVersions { .. } => "no versions published",
        }
    }
}

fn join_versions(versions: &[SemanticVersion]) -> String {
    if versions.is_empty() {
        return "none".to_string();
    }
    versions
        .iter()
        .map(SemanticVersion::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Transport, auth, or protocol failure while talking to a registry.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The registry rejected our credentials (HTTP 401/403).
    #[error("registry {url} refused access (status {status}); check your .upmconfig.toml credentials")]
    Unauthorized { url: String, status: u16 },

    /// Any other non-success status except 404.
    #[error("registry returned status {status} for {url}")]
    Http { url: String, status: u16 },

    /// Connection failure, timeout, or similar.
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    /// The response body was not a valid packument.
    #[error("invalid packument from {url}: {message}")]
    InvalidJson { url: String, message: String },
}

impl RegistryError {
    pub(crate) fn from_reqwest(url: &str, e: &reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            format!("request timed out: {e}")
        } else if e.is_connect() {
            format!("connection failed: {e}")
        } else {
            e.to_string()
        };
        Self::Network {
            url: url.to_string(),
            message,
        }
    }
}

/// Package manager error.
#[derive(Debug)]
pub struct PkgError {
    code: &'static str,
    message: String,
}

impl PkgError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a spec invalid error.
    pub fn spec_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_SPEC_INVALID, msg)
    }

    /// Create a package not found error.
    #[must_use]
    pub fn not_found(name: &str) -> Self {
        Self::new(codes::PKG_NOT_FOUND, format!("package not found: {name}"))
    }

    /// Create a registry error.
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_REGISTRY_ERROR, msg)
    }

    /// Create a manifest not found error.
    #[must_use]
    pub fn manifest_not_found(path: &std::path::Path) -> Self {
        Self::new(
            codes::PKG_MANIFEST_NOT_FOUND,
            format!("manifest not found: {}", path.display()),
        )
    }

    /// Create a manifest invalid error.
    pub fn manifest_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_MANIFEST_INVALID, msg)
    }

    /// Create a manifest write failure.
    pub fn manifest_write_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_MANIFEST_WRITE_FAILED, msg)
    }

    /// Create a package not installed error.
    #[must_use]
    pub fn not_installed(name: &str) -> Self {
        Self::new(
            codes::PKG_NOT_INSTALLED,
            format!("package not found in manifest: {name}"),
        )
    }

    /// Create a config invalid error.
    pub fn config_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_CONFIG_INVALID, msg)
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout(secs: u64) -> Self {
        Self::new(
            codes::PKG_TIMEOUT,
            format!("operation did not finish within {secs}s"),
        )
    }
}

impl fmt::Display for PkgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PkgError {}

impl From<RegistryError> for PkgError {
    fn from(e: RegistryError) -> Self {
        Self::registry(e.to_string())
    }
}

impl From<ResolveError> for PkgError {
    fn from(e: ResolveError) -> Self {
        let code = match &e {
            ResolveError::PackumentNotFound { .. } => codes::PKG_NOT_FOUND,
            ResolveError::VersionNotFound { .. } => codes::PKG_VERSION_NOT_FOUND,
            ResolveError::NoVersions { .. } => codes::PKG_NO_VERSIONS,
        };
        Self::new(code, e.to_string())
    }
}

impl From<io::Error> for PkgError {
    fn from(e: io::Error) -> Self {
        Self::manifest_write_failed(e.to_string())
    }
}
