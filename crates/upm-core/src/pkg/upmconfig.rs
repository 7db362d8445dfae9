//! `.upmconfig.toml` parser for registry credentials.
//!
//! Reads `[npmAuth."<registry url>"]` tables:
//!
//! ```toml
//! [npmAuth."https://package.example.com"]
//! token = "abc123"
//!
//! [npmAuth."https://legacy.example.com"]
//! _auth = "dXNlcjpwYXNz"
//! ```
//!
//! Credentials are sent on every request to their registry, so `alwaysAuth`
//! and `email` keys are accepted and ignored.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::error::PkgError;
use super::types::RegistryUrl;

/// Environment variable pointing at an alternative user config file.
pub const UPM_CONFIG_ENV: &str = "UPM_USER_CONFIG_FILE";

/// Default file name in the user's home directory.
pub const UPM_CONFIG_FILE_NAME: &str = ".upmconfig.toml";

/// Credentials for one registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NpmAuth {
    /// Bearer token.
    Token { token: String },
    /// Pre-encoded `user:password` for basic auth.
    Basic { auth: String },
}

impl NpmAuth {
    /// Value for the `Authorization` header.
    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            Self::Token { token, .. } => format!("Bearer {token}"),
            Self::Basic { auth, .. } => format!("Basic {auth}"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct UpmConfigFile {
    #[serde(rename = "npmAuth", default)]
    npm_auth: BTreeMap<String, AuthEntry>,
}

#[derive(Debug, Deserialize)]
struct AuthEntry {
    token: Option<String>,
    #[serde(rename = "_auth")]
    auth: Option<String>,
}

/// Parsed user configuration.
#[derive(Debug, Clone, Default)]
pub struct UpmConfig {
    auth: BTreeMap<RegistryUrl, NpmAuth>,
}

impl UpmConfig {
    /// Parse the content of a `.upmconfig.toml` file.
    ///
    /// Entries with an invalid URL or with neither `token` nor `_auth` are
    /// ignored.
    ///
    /// # Errors
    /// Returns an error if the content is not valid TOML.
    pub fn parse(content: &str) -> Result<Self, PkgError> {
        let file: UpmConfigFile = toml::from_str(content)
            .map_err(|e| PkgError::config_invalid(format!("invalid .upmconfig.toml: {e}")))?;

        let mut auth = BTreeMap::new();
        for (url, entry) in file.npm_auth {
            let Ok(url) = RegistryUrl::parse(&url) else {
                tracing::warn!(url = %url, "ignoring credentials for invalid registry URL");
                continue;
            };
            let credentials = match (entry.token, entry.auth) {
                (Some(token), _) => NpmAuth::Token { token },
                (None, Some(auth)) => NpmAuth::Basic { auth },
                (None, None) => continue,
            };
            auth.insert(url, credentials);
        }

        Ok(Self { auth })
    }

    /// Load the user config from `path`. A missing file yields an empty config.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, PkgError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(PkgError::config_invalid(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Credentials for a registry, if configured.
    #[must_use]
    pub fn auth_for(&self, url: &RegistryUrl) -> Option<&NpmAuth> {
        self.auth.get(url)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.auth.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.auth.is_empty()
    }
}

/// Location of the user config: `$UPM_USER_CONFIG_FILE`, else
/// `~/.upmconfig.toml`.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(UPM_CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs_next::home_dir().map(|home| home.join(UPM_CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> RegistryUrl {
        RegistryUrl::parse(s).unwrap()
    }

    #[test]
    fn test_parse_token() {
        let config = UpmConfig::parse(
            r#"
[npmAuth."https://package.example.com"]
token = "abc123"
alwaysAuth = true
"#,
        )
        .unwrap();

        let auth = config.auth_for(&url("https://package.example.com")).unwrap();
        assert_eq!(
            auth,
            &NpmAuth::Token {
                token: "abc123".to_string(),
            }
        );
        assert_eq!(auth.header_value(), "Bearer abc123");
    }

    #[test]
    fn test_parse_basic_auth() {
        let config = UpmConfig::parse(
            r#"
[npmAuth."https://legacy.example.com/"]
_auth = "dXNlcjpwYXNz"
email = "user@example.com"
"#,
        )
        .unwrap();

        // Trailing slash in the file does not matter.
        let auth = config.auth_for(&url("https://legacy.example.com")).unwrap();
        assert_eq!(auth.header_value(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_entries_without_credentials_ignored() {
        let config = UpmConfig::parse(
            r#"
[npmAuth."https://a.example.com"]
alwaysAuth = true

[npmAuth."not a url"]
token = "x"
"#,
        )
        .unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_invalid_toml() {
        let err = UpmConfig::parse("[npmAuth").unwrap_err();
        assert_eq!(err.code(), super::super::error::codes::PKG_CONFIG_INVALID);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = UpmConfig::load(&dir.path().join(".upmconfig.toml")).unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".upmconfig.toml");
        std::fs::write(
            &path,
            "[npmAuth.\"http://localhost:4873\"]\ntoken = \"local\"\n",
        )
        .unwrap();
        let config = UpmConfig::load(&path).unwrap();
        assert_eq!(config.len(), 1);
        assert!(config.auth_for(&url("http://localhost:4873")).is_some());
    }
}
