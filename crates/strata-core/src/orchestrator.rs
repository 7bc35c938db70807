//! Drives the stage graph: resolve targets, bind credentials, dispatch
//! handlers, aggregate a pipeline report.
//!
//! Ordering guarantees: stages execute strictly by run order; within a
//! stage, run-order groups execute strictly in ascending order and a group
//! starts only after the prior group has fully settled. Modules sharing a
//! run order are launched together.

use crate::credentials::CredentialBroker;
use crate::directory::AccountDirectory;
use crate::error::{Result, StrataError};
use crate::report::{
    ActionResult, ModuleOutcome, ModuleReport, ModuleStatus, PipelineReport, PipelineState,
    StageReport,
};
use crate::retry::{with_retry, RetryConfig};
use crate::stage::{FailurePolicy, Module, ModuleContext, Stage, StageGraph};
use crate::target::TargetResolver;
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// PipelineSettings
// ---------------------------------------------------------------------------

/// Process-level inputs threaded into every run: region list, delegation
/// role, global concurrency bound, dry-run flag, retry policy for remote
/// calls the orchestrator itself makes.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub regions: Vec<String>,
    pub assume_role_name: String,
    pub max_concurrent: usize,
    pub dry_run: bool,
    pub retry: RetryConfig,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator<'a> {
    graph: &'a StageGraph,
    directory: &'a AccountDirectory,
    broker: &'a CredentialBroker,
    settings: PipelineSettings,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        graph: &'a StageGraph,
        directory: &'a AccountDirectory,
        broker: &'a CredentialBroker,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            graph,
            directory,
            broker,
            settings,
        }
    }

    /// Execute the pipeline to completion or abort.
    ///
    /// Returns `Err` only for configuration errors caught before any
    /// network call. Everything that happens after dispatch, including a
    /// stage-fatal abort, is reported in the returned [`PipelineReport`].
    pub async fn run(&self) -> Result<PipelineReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        // Referential consistency of every target policy is checked before
        // a single remote call is made.
        let resolver = TargetResolver::new(self.directory);
        for stage in self.graph.stages() {
            for module in &stage.modules {
                resolver.validate(&module.target)?;
            }
        }

        tracing::info!(%run_id, dry_run = self.settings.dry_run, "pipeline starting");

        let mut stages = Vec::new();
        let mut abort: Option<(String, String)> = None;

        for stage in self.graph.stages() {
            tracing::info!(stage = %stage.name, run_order = stage.run_order, "stage starting");
            let report = self.run_stage(stage, &mut abort).await;
            stages.push(report);
            if abort.is_some() {
                break;
            }
        }

        let state = match abort {
            Some((stage, module)) => {
                tracing::error!(%stage, %module, "pipeline aborted");
                PipelineState::Aborted { stage, module }
            }
            None => PipelineState::Completed,
        };

        Ok(PipelineReport {
            run_id,
            state,
            dry_run: self.settings.dry_run,
            started_at,
            finished_at: Utc::now(),
            stages,
        })
    }

    /// Run one stage's run-order groups in sequence. On a fatal module the
    /// current group still settles in full, later groups are recorded as
    /// skipped, and `abort` names the culprit.
    async fn run_stage(&self, stage: &Stage, abort: &mut Option<(String, String)>) -> StageReport {
        let groups = StageGraph::run_order_groups(stage);
        let mut modules = Vec::new();

        for (idx, group) in groups.iter().enumerate() {
            if abort.is_some() {
                for module in groups[idx..].iter().flatten() {
                    modules.push(ModuleReport {
                        module: module.name.clone(),
                        run_order: module.run_order,
                        status: ModuleStatus::Skipped,
                    });
                }
                break;
            }

            // Everything in one run-order group launches together and the
            // group settles in full before any abort is finalized.
            let reports = join_all(group.iter().map(|m| self.run_module(stage, m))).await;

            for (module, report) in group.iter().zip(reports) {
                let fatal = match &report.status {
                    ModuleStatus::Fatal { .. } => true,
                    ModuleStatus::Completed { outcome } => {
                        module.on_error == FailurePolicy::Abort && outcome.has_failures()
                    }
                    ModuleStatus::Skipped => false,
                };
                if fatal && abort.is_none() {
                    *abort = Some((stage.name.clone(), module.name.clone()));
                }
                modules.push(report);
            }
        }

        StageReport {
            stage: stage.name.clone(),
            run_order: stage.run_order,
            modules,
        }
    }

    /// Resolve targets, bind credentials, run the handler. Never returns
    /// early: every failure mode lands in the module's own report.
    async fn run_module(&self, stage: &Stage, module: &Module) -> ModuleReport {
        let status = match self.execute_module(module).await {
            Ok(outcome) => ModuleStatus::Completed { outcome },
            Err(e) => {
                let fatal = StrataError::StageFatal {
                    stage: stage.name.clone(),
                    module: module.name.clone(),
                    reason: e.to_string(),
                };
                ModuleStatus::Fatal {
                    reason: fatal.to_string(),
                }
            }
        };
        ModuleReport {
            module: module.name.clone(),
            run_order: module.run_order,
            status,
        }
    }

    async fn execute_module(&self, module: &Module) -> Result<ModuleOutcome> {
        let resolver = TargetResolver::new(self.directory);
        let resolved = resolver.resolve_all(&module.target)?;

        let regions: Vec<String> = self
            .settings
            .regions
            .iter()
            .filter(|&r| !module.target.excluded_regions.contains(r))
            .cloned()
            .collect();

        if resolved.is_empty() || regions.is_empty() {
            return Ok(ModuleOutcome::new(
                "no matching accounts or regions",
                vec![],
            ));
        }

        tracing::info!(
            module = %module.name,
            accounts = resolved.len(),
            regions = regions.len(),
            "module dispatching"
        );

        // Bind credentials per account. The broker never retries; the
        // orchestrator owns the retry decision here. A denied account fails
        // only its own slot.
        let sts_region = &regions[0];
        let mut credentials_by_account = HashMap::new();
        let mut credential_failures = Vec::new();

        for account_id in &resolved.account_ids {
            let attempt = with_retry(&self.settings.retry, || {
                self.broker.get_credentials(
                    account_id,
                    sts_region,
                    &self.settings.assume_role_name,
                )
            })
            .await;
            match attempt {
                Ok(credential) => {
                    credentials_by_account.insert(account_id.clone(), credential);
                }
                Err(e) => {
                    tracing::warn!(account = %account_id, error = %e, "credential binding failed");
                    credential_failures.push(ActionResult::failure(
                        account_id.clone(),
                        sts_region.clone(),
                        e.to_string(),
                    ));
                }
            }
        }

        let mut account_ids: Vec<String> = credentials_by_account.keys().cloned().collect();
        account_ids.sort();

        let ctx = ModuleContext {
            account_ids,
            regions,
            credentials_by_account,
            dry_run: self.settings.dry_run,
            max_concurrent: self.settings.max_concurrent,
        };

        let mut outcome = module.handler.execute(&ctx).await?;

        // Accounts that never got credentials still occupy their slots in
        // the aggregated results.
        if !credential_failures.is_empty() {
            credential_failures.extend(outcome.results);
            outcome.results = credential_failures;
        }
        Ok(outcome)
    }
}
