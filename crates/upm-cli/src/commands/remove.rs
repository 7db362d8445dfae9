use miette::Result;
use serde::Serialize;
use upm_core::pkg::{remove_packages, DomainName, PkgError, RemoveReport};
use upm_core::Config;

use super::{exit_with_error, print_json, project_root};

#[derive(Serialize)]
struct RemoveResult {
    ok: bool,
    removed: Vec<RemovedInfo>,
    errors: Vec<PackageErrorInfo>,
    manifest_changed: bool,
}

#[derive(Serialize)]
struct RemovedInfo {
    name: String,
    version: String,
}

#[derive(Serialize)]
pub(crate) struct PackageErrorInfo {
    pub package: String,
    pub code: String,
    pub message: String,
}

impl PackageErrorInfo {
    pub(crate) fn new(package: &str, error: &PkgError) -> Self {
        Self {
            package: package.to_string(),
            code: error.code().to_string(),
            message: error.message().to_string(),
        }
    }
}

pub fn run(config: &Config, packages: &[String]) -> Result<()> {
    let json = config.json_logs;

    let prepared = packages
        .iter()
        .map(|p| DomainName::parse(p).map_err(|e| PkgError::spec_invalid(e.to_string())))
        .collect::<std::result::Result<Vec<_>, _>>()
        .and_then(|names| Ok((names, project_root(config)?)));
    let report = match prepared.and_then(|(names, root)| remove_packages(&root, &names)) {
        Ok(report) => report,
        Err(e) => exit_with_error(json, &e),
    };

    if json {
        print_json(&to_result(&report))?;
    } else {
        print_human(&report);
    }

    if report.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}

fn to_result(report: &RemoveReport) -> RemoveResult {
    let mut result = RemoveResult {
        ok: !report.has_errors(),
        removed: Vec::new(),
        errors: Vec::new(),
        manifest_changed: report.manifest_changed,
    };
    for outcome in &report.packages {
        match &outcome.result {
            Ok(removed) => result.removed.push(RemovedInfo {
                name: removed.name.clone(),
                version: removed.version.clone(),
            }),
            Err(e) => result.errors.push(PackageErrorInfo::new(&outcome.reference, e)),
        }
    }
    result
}

fn print_human(report: &RemoveReport) {
    for outcome in &report.packages {
        match &outcome.result {
            Ok(removed) => println!("removed {}@{}", removed.name, removed.version),
            Err(e) => eprintln!("error: {}: {e}", outcome.reference),
        }
    }
    if report.manifest_changed {
        println!("please open Unity project to apply changes");
    }
}
