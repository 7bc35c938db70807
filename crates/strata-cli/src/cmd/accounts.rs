use crate::output;
use anyhow::Context;
use std::path::Path;
use strata_core::config::OrgConfig;

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = OrgConfig::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let directory = config.directory()?;

    if json {
        output::print_json(&directory.accounts())?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = directory
        .accounts()
        .iter()
        .map(|a| {
            vec![
                a.name.clone(),
                a.id.clone(),
                a.ou_path.clone(),
                a.email.clone(),
            ]
        })
        .collect();
    output::print_table(&["NAME", "ID", "OU", "EMAIL"], &rows);
    Ok(())
}
