pub mod add;
pub mod deps;
pub mod remove;
pub mod version;

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use upm_core::paths::require_project_root;
use upm_core::pkg::{
    user_config_path, PkgError, RegistryClient, RegistryEnv, RegistryEnvOptions, UpmConfig,
};
use upm_core::{Config, Error};

/// Registry selection shared by the network commands.
#[derive(Debug, Clone)]
pub struct RegistryArgs {
    pub registry: Option<String>,
    pub no_upstream: bool,
}

/// JSON shape of a failed command.
#[derive(Serialize)]
struct ErrorResult {
    ok: bool,
    error: String,
}

/// Build the registry environment from flags, env vars, and `.upmconfig.toml`.
pub(crate) fn registry_env(args: &RegistryArgs) -> Result<RegistryEnv, PkgError> {
    let credentials = match user_config_path() {
        Some(path) => UpmConfig::load(&path)?,
        None => UpmConfig::default(),
    };
    let options = RegistryEnvOptions::new()
        .with_registry(args.registry.clone())
        .with_upstream(!args.no_upstream);
    RegistryEnv::build(&options, &credentials)
}

pub(crate) fn registry_client() -> Result<RegistryClient, PkgError> {
    RegistryClient::new().map_err(PkgError::from)
}

pub(crate) fn project_root(config: &Config) -> Result<PathBuf, PkgError> {
    require_project_root(&config.cwd).map_err(|e| match e {
        Error::Pkg(e) => e,
        e => PkgError::new(e.code(), e.to_string()),
    })
}

/// Run `fut` on a fresh runtime, bounded by the configured deadline.
pub(crate) fn block_on_with_deadline<T, F>(
    config: &Config,
    fut: F,
) -> Result<std::result::Result<T, PkgError>>
where
    F: Future<Output = std::result::Result<T, PkgError>>,
{
    let secs = config.timeout_secs;
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    Ok(runtime.block_on(async move {
        tokio::time::timeout(Duration::from_secs(secs), fut)
            .await
            .unwrap_or_else(|_| Err(PkgError::timeout(secs)))
    }))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

/// Report a command-level failure and exit with status 1.
pub(crate) fn exit_with_error(json: bool, error: &PkgError) -> ! {
    if json {
        let result = ErrorResult {
            ok: false,
            error: error.to_string(),
        };
        if let Ok(s) = serde_json::to_string_pretty(&result) {
            println!("{s}");
        }
    } else {
        eprintln!("error: {error}");
    }
    std::process::exit(1);
}
