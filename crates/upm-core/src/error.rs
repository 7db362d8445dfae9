use std::path::PathBuf;
use thiserror::Error;

use crate::pkg::{pkg_codes, PkgError};

/// Core error type for upm operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no Unity project found from {start} (looked for Packages/manifest.json)")]
    ProjectNotFound { start: PathBuf },

    #[error(transparent)]
    Pkg(#[from] PkgError),

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Stable code for machine-readable output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Pkg(e) => e.code(),
            Self::ProjectNotFound { .. } => pkg_codes::PKG_MANIFEST_NOT_FOUND,
            Self::Io(_) | Self::Other(_) => "UPM_INTERNAL_ERROR",
        }
    }
}
