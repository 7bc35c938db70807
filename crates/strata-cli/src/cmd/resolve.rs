use crate::output;
use anyhow::Context;
use std::path::Path;
use strata_core::config::OrgConfig;
use strata_core::target::{DeploymentTarget, TargetResolver};

pub fn run(
    config_path: &Path,
    module: Option<&str>,
    accounts: Vec<String>,
    ous: Vec<String>,
    excluded_accounts: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let config = OrgConfig::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let directory = config.directory()?;

    let target = match module {
        Some(name) => config
            .pipeline
            .stages
            .iter()
            .flat_map(|s| &s.modules)
            .find(|m| m.name == name)
            .map(|m| m.target.clone())
            .with_context(|| format!("no module named '{name}' in the pipeline"))?,
        None => DeploymentTarget {
            accounts,
            organizational_units: ous,
            excluded_accounts,
            ..Default::default()
        },
    };

    let resolver = TargetResolver::new(&directory);
    let resolved = resolver.resolve_all(&target)?;

    if json {
        output::print_json(&resolved)?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = resolved
        .account_ids
        .iter()
        .map(|id| {
            let account = directory.by_id(id);
            vec![
                id.clone(),
                account.map(|a| a.name.clone()).unwrap_or_default(),
                account.map(|a| a.ou_path.clone()).unwrap_or_default(),
            ]
        })
        .collect();
    output::print_table(&["ID", "NAME", "OU"], &rows);
    println!("{} account(s)", resolved.len());
    Ok(())
}
