use crate::handlers;
use crate::output;
use anyhow::Context;
use std::path::Path;
use strata_core::config::{OrgConfig, WarnLevel};
use strata_core::target::TargetResolver;

pub fn run(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = OrgConfig::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    let warnings = config.validate();
    let directory = config.directory()?;

    // Graph construction checks stage ordering and module kinds; the
    // resolver pass checks every target against the directory.
    let graph = handlers::build_graph(&config)?;
    let resolver = TargetResolver::new(&directory);
    for stage in graph.stages() {
        for module in &stage.modules {
            resolver.validate(&module.target).with_context(|| {
                format!("invalid target on module '{}' in stage '{}'", module.name, stage.name)
            })?;
        }
    }

    if json {
        output::print_json(&warnings)?;
    } else {
        for warning in &warnings {
            let tag = match warning.level {
                WarnLevel::Error => "ERROR",
                WarnLevel::Warning => "warning",
            };
            println!("{tag}: {}", warning.message);
        }
        println!(
            "configuration valid: {} accounts, {} stages",
            directory.accounts().len(),
            graph.stages().len()
        );
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("configuration has errors");
    }
    Ok(())
}
