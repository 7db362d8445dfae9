//! Registry environment of a command: which registries to query, in which
//! order, and with which credentials.

use super::builtin::BuiltInPackageChecker;
use super::error::PkgError;
use super::registry::{
    Registry, DEFAULT_REGISTRY, DOCS_BASE_URL_ENV, REGISTRY_ENV, UNITY_DOCS_BASE_URL,
    UNITY_REGISTRY, UPSTREAM_REGISTRY_ENV,
};
use super::types::RegistryUrl;
use super::upmconfig::UpmConfig;

/// Registries and endpoints used by one command invocation.
#[derive(Debug, Clone)]
pub struct RegistryEnv {
    /// The registry packages are added from; scopes are recorded for it.
    pub primary: Registry,
    /// Fallback registry, usually Unity's. `None` with `--no-upstream`.
    pub upstream: Option<Registry>,
    /// Vendor registry consulted by the built-in check.
    pub vendor: Registry,
    /// Documentation site consulted by the built-in check.
    pub docs_base_url: String,
}

/// Inputs for [`RegistryEnv::build`]. `None` falls back to the
/// environment, then to defaults.
#[derive(Debug, Clone, Default)]
pub struct RegistryEnvOptions {
    pub registry: Option<String>,
    pub upstream: bool,
    pub upstream_registry: Option<String>,
    pub docs_base_url: Option<String>,
}

impl RegistryEnvOptions {
    /// Options with upstream enabled and everything else from the environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            upstream: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Option<String>) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_upstream(mut self, upstream: bool) -> Self {
        self.upstream = upstream;
        self
    }
}

impl RegistryEnv {
    /// Build the environment from options, env vars, and user credentials.
    ///
    /// # Errors
    /// `PKG_CONFIG_INVALID` if a registry URL is malformed.
    pub fn build(options: &RegistryEnvOptions, config: &UpmConfig) -> Result<Self, PkgError> {
        let primary = resolve_url(options.registry.clone(), REGISTRY_ENV, DEFAULT_REGISTRY)?;
        let vendor = resolve_url(
            options.upstream_registry.clone(),
            UPSTREAM_REGISTRY_ENV,
            UNITY_REGISTRY,
        )?;
        let docs_base_url = options
            .docs_base_url
            .clone()
            .or_else(|| env_value(DOCS_BASE_URL_ENV))
            .unwrap_or_else(|| UNITY_DOCS_BASE_URL.to_string());

        let with_auth = |url: RegistryUrl| {
            let auth = config.auth_for(&url).cloned();
            Registry::new(url).with_auth(auth)
        };

        let env = Self {
            primary: with_auth(primary),
            upstream: options.upstream.then(|| with_auth(vendor.clone())),
            vendor: with_auth(vendor),
            docs_base_url,
        };
        tracing::debug!(
            primary = %env.primary.url,
            upstream = env.upstream.as_ref().map(|r| r.url.to_string()),
            authenticated = env.primary.auth.is_some(),
            "registry environment"
        );
        Ok(env)
    }

    /// Registries in priority order: primary, then upstream.
    #[must_use]
    pub fn registries(&self) -> Vec<Registry> {
        std::iter::once(self.primary.clone())
            .chain(self.upstream.clone())
            .collect()
    }

    #[must_use]
    pub fn built_in_checker(&self) -> BuiltInPackageChecker {
        BuiltInPackageChecker::new(self.docs_base_url.clone(), self.vendor.clone())
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn resolve_url(explicit: Option<String>, env_key: &str, default: &str) -> Result<RegistryUrl, PkgError> {
    let raw = explicit
        .or_else(|| env_value(env_key))
        .unwrap_or_else(|| default.to_string());
    RegistryUrl::parse(&raw).map_err(|e| PkgError::config_invalid(e.to_string()))
}
