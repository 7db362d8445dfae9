use miette::Result;
use upm_core::pkg::{resolve_deps, PackageReference, PkgError};
use upm_core::Config;

use super::{
    block_on_with_deadline, exit_with_error, print_json, registry_client, registry_env,
    RegistryArgs,
};

pub fn run(config: &Config, registry: &RegistryArgs, package: &str, deep: bool) -> Result<()> {
    let json = config.json_logs;

    let prepared = PackageReference::parse(package).and_then(|reference| {
        Ok::<_, PkgError>((reference, registry_env(registry)?, registry_client()?))
    });
    let (reference, env, client) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => exit_with_error(json, &e),
    };

    let result = block_on_with_deadline(config, async {
        resolve_deps(&env, &client, &client, &reference, deep).await
    })?;

    match result {
        Ok(deps) => {
            if json {
                print_json(&deps.to_json())?;
            } else {
                for line in deps.render() {
                    println!("{line}");
                }
            }
            Ok(())
        }
        Err(e) => exit_with_error(json, &e),
    }
}
