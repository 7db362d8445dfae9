//! Detection of packages bundled with the editor.
//!
//! A package is built-in when the vendor documents it in the manual but does
//! not publish the requested version to its registry. Such packages resolve
//! without a packument and have no dependencies.

use super::cache::PackumentCache;
use super::error::RegistryError;
use super::registry::{PackumentFetcher, Registry, UrlExistenceChecker};
use super::types::{DomainName, SemanticVersion};

/// Decides whether a `(name, version)` is a built-in editor package.
#[derive(Debug, Clone)]
pub struct BuiltInPackageChecker {
    docs_base_url: String,
    vendor: Registry,
}

impl BuiltInPackageChecker {
    #[must_use]
    pub fn new(docs_base_url: impl Into<String>, vendor: Registry) -> Self {
        Self {
            docs_base_url: docs_base_url.into().trim_end_matches('/').to_string(),
            vendor,
        }
    }

    /// Manual page whose existence marks a vendor package.
    #[must_use]
    pub fn docs_url(&self, name: &DomainName) -> String {
        format!("{}/Manual/{name}.html", self.docs_base_url)
    }

    /// Check a package. The vendor packument fetch goes through `cache`.
    ///
    /// # Errors
    /// Network failures from either the docs site or the vendor registry.
    pub async fn is_built_in(
        &self,
        urls: &dyn UrlExistenceChecker,
        fetcher: &dyn PackumentFetcher,
        cache: &mut PackumentCache,
        name: &DomainName,
        version: &SemanticVersion,
    ) -> Result<bool, RegistryError> {
        if !urls.url_exists(&self.docs_url(name)).await? {
            return Ok(false);
        }

        let published = cache
            .get_or_fetch(fetcher, &self.vendor, name)
            .await?
            .is_some_and(|packument| packument.has_version(version));

        tracing::debug!(name = %name, version = %version, built_in = !published, "vendor package");
        Ok(!published)
    }
}
