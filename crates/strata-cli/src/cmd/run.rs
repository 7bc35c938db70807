use crate::handlers::{self, OfflineAssumer};
use crate::output;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use strata_core::config::{OrgConfig, WarnLevel};
use strata_core::credentials::CredentialBroker;
use strata_core::orchestrator::{Orchestrator, PipelineSettings};
use strata_core::report::PipelineState;
use strata_core::retry::RetryConfig;
use strata_core::StrataError;

pub fn run(
    config_path: &Path,
    dry_run: bool,
    max_concurrent: Option<u64>,
    regions: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let config = OrgConfig::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    let warnings = config.validate();
    if let Some(warning) = warnings.iter().find(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("configuration error: {}", warning.message);
    }

    let directory = config.directory()?;
    let graph = handlers::build_graph(&config)?;

    let management = config
        .management_account_name()
        .context("no accounts configured")?;
    let caller_account_id = directory.account_id(management)?.to_string();
    let broker = CredentialBroker::new(
        caller_account_id,
        handlers::offline_credential(),
        Arc::new(OfflineAssumer),
    );

    let settings = PipelineSettings {
        regions: if regions.is_empty() {
            config.regions.clone()
        } else {
            regions
        },
        assume_role_name: config.assume_role_name.clone(),
        max_concurrent: max_concurrent.map_or(config.max_concurrent, |n| n as usize),
        dry_run,
        retry: RetryConfig::default(),
    };

    let orchestrator = Orchestrator::new(&graph, &directory, &broker, settings);

    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    let report = runtime.block_on(orchestrator.run())?;

    if json {
        output::print_json(&report)?;
    } else {
        print!("{report}");
    }

    if let PipelineState::Aborted { stage, module } = &report.state {
        return Err(StrataError::StageFatal {
            stage: stage.clone(),
            module: module.clone(),
            reason: "pipeline aborted; see report for details".into(),
        }
        .into());
    }
    Ok(())
}
