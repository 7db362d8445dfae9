#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use std::path::PathBuf;
use upm_core::config::DEFAULT_TIMEOUT_SECS;
use upm_core::pkg::REGISTRY_ENV;
use upm_core::Config;

use commands::RegistryArgs;

#[derive(Parser, Debug)]
#[command(name = "upm")]
#[command(author, version, about = "Unity package manager client for npm-compatible registries", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v INFO, -vv DEBUG, -vvv TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Primary registry URL
    #[arg(long, global = true, env = REGISTRY_ENV, value_name = "URL")]
    registry: Option<String>,

    /// Do not fall back to the Unity registry
    #[arg(long, global = true)]
    no_upstream: bool,

    /// Give up after this many seconds
    #[arg(
        long,
        global = true,
        value_name = "SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Show the dependency tree of a package
    #[command(visible_alias = "dep")]
    Deps {
        /// Package reference: name[@version|latest|stable]
        package: String,

        /// Resolve the whole tree instead of direct dependencies only
        #[arg(long)]
        deep: bool,
    },

    /// Add packages to the project manifest
    #[command(visible_aliases = ["install", "i"])]
    Add {
        /// Package references: name[@version|latest|stable|url]
        #[arg(required = true)]
        packages: Vec<String>,

        /// Also add the packages to `testables`
        #[arg(short, long)]
        test: bool,

        /// Add even if the editor is too old or dependencies are missing
        #[arg(short, long)]
        force: bool,
    },

    /// Remove packages from the project manifest
    #[command(visible_aliases = ["rm", "uninstall"])]
    Remove {
        /// Package names
        #[arg(required = true)]
        packages: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json)
        .with_timeout_secs(cli.timeout);

    if matches!(cli.command, Commands::Version) {
        return commands::version::run();
    }

    logging::init(config.verbosity, config.json_logs);
    tracing::debug!(cwd = %config.cwd.display(), "starting");

    let registry = RegistryArgs {
        registry: cli.registry,
        no_upstream: cli.no_upstream,
    };

    match cli.command {
        Commands::Version => commands::version::run(),
        Commands::Deps { package, deep } => commands::deps::run(&config, &registry, &package, deep),
        Commands::Add {
            packages,
            test,
            force,
        } => commands::add::run(&config, &registry, &packages, test, force),
        Commands::Remove { packages } => commands::remove::run(&config, &packages),
    }
}
