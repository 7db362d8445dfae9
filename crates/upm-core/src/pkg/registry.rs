//! Registry access: the fetch seams used by the resolver and their HTTP
//! implementation.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::error::RegistryError;
use super::packument::Packument;
use super::types::{DomainName, RegistryUrl};
use super::upmconfig::NpmAuth;

/// Default primary registry URL.
pub const DEFAULT_REGISTRY: &str = "https://package.openupm.com";

/// Unity's own registry, used as upstream and as the built-in oracle.
pub const UNITY_REGISTRY: &str = "https://packages.unity.com";

/// Base URL of the Unity manual, used to detect official packages.
pub const UNITY_DOCS_BASE_URL: &str = "https://docs.unity3d.com";

/// Environment variable to override the primary registry URL.
pub const REGISTRY_ENV: &str = "UPM_REGISTRY";

/// Environment variable to override the upstream (Unity) registry URL.
pub const UPSTREAM_REGISTRY_ENV: &str = "UPM_UPSTREAM_REGISTRY";

/// Environment variable to override the documentation base URL.
pub const DOCS_BASE_URL_ENV: &str = "UPM_DOCS_BASE_URL";

/// A registry to query, with optional credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    pub url: RegistryUrl,
    pub auth: Option<NpmAuth>,
}

impl Registry {
    #[must_use]
    pub fn new(url: RegistryUrl) -> Self {
        Self { url, auth: None }
    }

    #[must_use]
    pub fn with_auth(mut self, auth: Option<NpmAuth>) -> Self {
        self.auth = auth;
        self
    }
}

/// Fetches packuments by `(registry, name)`.
#[async_trait]
pub trait PackumentFetcher: Send + Sync {
    /// Fetch a packument.
    ///
    /// Returns `Ok(None)` when the registry does not know the package.
    ///
    /// # Errors
    /// Any other failure (auth, server, network, malformed body).
    async fn fetch_packument(
        &self,
        registry: &Registry,
        name: &DomainName,
    ) -> Result<Option<Packument>, RegistryError>;
}

/// Checks whether a URL exists.
#[async_trait]
pub trait UrlExistenceChecker: Send + Sync {
    /// HEAD the URL. Any non-200 status yields `false`.
    ///
    /// # Errors
    /// Network failures.
    async fn url_exists(&self, url: &str) -> Result<bool, RegistryError>;
}

/// HTTP client for npm-compatible registries.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
}

impl RegistryClient {
    /// Create a client with the default timeouts.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_timeout(Duration::from_secs(15))
    }

    /// Create a client with a custom per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(timeout: Duration) -> Result<Self, RegistryError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(concat!("upm/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::Network {
                url: String::new(),
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { http })
    }
}

#[async_trait]
impl PackumentFetcher for RegistryClient {
    async fn fetch_packument(
        &self,
        registry: &Registry,
        name: &DomainName,
    ) -> Result<Option<Packument>, RegistryError> {
        let url = registry.url.packument_url(name);
        tracing::debug!(url = %url, "fetching packument");

        let mut request = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(auth) = &registry.auth {
            request = request.header(reqwest::header::AUTHORIZATION, auth.header_value());
        }

        let response = request
            .send()
            .await
            .map_err(|e| RegistryError::from_reqwest(&url, &e))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!(url = %url, "packument not found");
                return Ok(None);
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(RegistryError::Unauthorized {
                    url,
                    status: response.status().as_u16(),
                });
            }
            status if !status.is_success() => {
                return Err(RegistryError::Http {
                    url,
                    status: status.as_u16(),
                });
            }
            _ => {}
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RegistryError::from_reqwest(&url, &e))?;
        let packument: Packument =
            serde_json::from_slice(&body).map_err(|e| RegistryError::InvalidJson {
                url: url.clone(),
                message: e.to_string(),
            })?;

        Ok(Some(packument))
    }
}

#[async_trait]
impl UrlExistenceChecker for RegistryClient {
    async fn url_exists(&self, url: &str) -> Result<bool, RegistryError> {
        let response = self
            .http
            .head(url)
            .send()
            .await
            .map_err(|e| RegistryError::from_reqwest(url, &e))?;
        let exists = response.status() == StatusCode::OK;
        tracing::debug!(url = %url, status = %response.status(), exists, "checked url");
        Ok(exists)
    }
}
