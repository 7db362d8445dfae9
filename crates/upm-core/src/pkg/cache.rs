//! Per-call packument cache.
//!
//! Keyed by `(registry url, package name)`. Both hits and 404 misses are
//! stored, so a registry is asked about a given name at most once during a
//! resolve call. Transport errors are not cached.

use std::collections::HashMap;
use std::sync::Arc;

use super::error::RegistryError;
use super::packument::Packument;
use super::registry::{PackumentFetcher, Registry};
use super::types::{DomainName, RegistryUrl};

/// Transient packument cache owned by a single resolve call.
#[derive(Debug, Default)]
pub struct PackumentCache {
    entries: HashMap<(RegistryUrl, DomainName), Option<Arc<Packument>>>,
}

impl PackumentCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached packument or fetch and remember it.
    ///
    /// # Errors
    /// Propagates fetcher errors; nothing is cached in that case.
    pub async fn get_or_fetch(
        &mut self,
        fetcher: &dyn PackumentFetcher,
        registry: &Registry,
        name: &DomainName,
    ) -> Result<Option<Arc<Packument>>, RegistryError> {
        let key = (registry.url.clone(), name.clone());
        if let Some(cached) = self.entries.get(&key) {
            tracing::debug!(registry = %registry.url, name = %name, hit = cached.is_some(), "packument cache hit");
            return Ok(cached.clone());
        }

        let fetched = fetcher.fetch_packument(registry, name).await?.map(Arc::new);
        self.entries.insert(key, fetched.clone());
        Ok(fetched)
    }

    /// Number of `(registry, name)` pairs seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
