use miette::Result;
use serde::Serialize;
use upm_core::pkg::{
    add_packages, AddOptions, AddReport, DependencyChange, PackageReference, PkgError,
};
use upm_core::Config;

use super::remove::PackageErrorInfo;
use super::{
    block_on_with_deadline, exit_with_error, print_json, project_root, registry_client,
    registry_env, RegistryArgs,
};

#[derive(Serialize)]
struct AddResult {
    ok: bool,
    added: Vec<AddedInfo>,
    errors: Vec<PackageErrorInfo>,
    manifest_changed: bool,
}

#[derive(Serialize)]
struct AddedInfo {
    name: String,
    version: String,
    /// `added`, `modified`, or `unchanged`.
    change: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    scopes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    unresolved: Vec<String>,
}

pub fn run(
    config: &Config,
    registry: &RegistryArgs,
    packages: &[String],
    test: bool,
    force: bool,
) -> Result<()> {
    let json = config.json_logs;

    let prepared = packages
        .iter()
        .map(|p| PackageReference::parse(p.as_str()))
        .collect::<std::result::Result<Vec<_>, _>>()
        .and_then(|references| {
            Ok::<_, PkgError>((
                references,
                project_root(config)?,
                registry_env(registry)?,
                registry_client()?,
            ))
        });
    let (references, root, env, client) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => exit_with_error(json, &e),
    };

    let options = AddOptions { test, force };
    let result = block_on_with_deadline(config, async {
        add_packages(&root, &env, &client, &client, &references, options).await
    })?;
    let report = match result {
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

fn to_result(report: &AddReport) -> AddResult {
    let mut result = AddResult {
        ok: !report.has_errors(),
        added: Vec::new(),
        errors: Vec::new(),
        manifest_changed: report.manifest_changed,
    };
    for outcome in &report.packages {
        match &outcome.result {
            Ok(added) => {
                let (change, previous) = match &added.change {
                    DependencyChange::Added => ("added", None),
                    DependencyChange::Modified { previous } => ("modified", Some(previous.clone())),
                    DependencyChange::Unchanged => ("unchanged", None),
                };
                result.added.push(AddedInfo {
                    name: added.name.clone(),
                    version: added.version.clone(),
                    change,
                    previous,
                    source: added.source.as_ref().map(ToString::to_string),
                    scopes: added.new_scopes.clone(),
                    unresolved: added.unresolved.clone(),
                });
            }
            Err(e) => result.errors.push(PackageErrorInfo::new(&outcome.reference, e)),
        }
    }
    result
}

fn print_human(report: &AddReport) {
    for outcome in &report.packages {
        let added = match &outcome.result {
            Ok(added) => added,
            Err(e) => {
                eprintln!("error: {}: {e}", outcome.reference);
                continue;
            }
        };
        match &added.change {
            DependencyChange::Added => println!("added {}@{}", added.name, added.version),
            DependencyChange::Modified { previous } => {
                println!("modified {} {previous} => {}", added.name, added.version);
            }
            DependencyChange::Unchanged => println!("existed {}@{}", added.name, added.version),
        }
        for dependency in &added.unresolved {
            eprintln!("warning: {dependency} could not be resolved");
        }
    }
    if report.manifest_changed {
        println!("please open Unity project to apply changes");
    }
}
