//! Built-in module handlers and the kind registry.
//!
//! The handlers shipped with the binary are deliberately non-mutating: they
//! fan out over the resolved accounts and report what a deployment backend
//! would do. A real cloud binding supplies its own [`ModuleHandler`] and
//! [`RoleAssumer`] implementations.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use strata_core::config::OrgConfig;
use strata_core::credentials::{Credential, RoleAssumer};
use strata_core::executor::{run_batch, BatchTask};
use strata_core::report::{ActionResult, ModuleOutcome};
use strata_core::stage::{Module, ModuleContext, ModuleHandler, Stage, StageGraph};
use strata_core::{Result, StrataError};

// ---------------------------------------------------------------------------
// DescribeHandler
// ---------------------------------------------------------------------------

/// Fans out one describe action per account+region through the bounded
/// executor and reports what a deployment would touch. Honors dry-run by
/// construction: it never mutates anything.
pub struct DescribeHandler {
    module_name: String,
}

#[async_trait]
impl ModuleHandler for DescribeHandler {
    async fn execute(&self, ctx: &ModuleContext) -> Result<ModuleOutcome> {
        let mut tasks = Vec::new();
        for account in &ctx.account_ids {
            for region in &ctx.regions {
                let account = account.clone();
                let region = region.clone();
                let module = self.module_name.clone();
                let verb = if ctx.dry_run { "would apply" } else { "applied" };
                tasks.push(BatchTask::new(account.clone(), region.clone(), async move {
                    ActionResult::success(
                        account.clone(),
                        region.clone(),
                        format!("{verb} module '{module}' in {account}/{region}"),
                    )
                }));
            }
        }

        let total = tasks.len();
        let results = run_batch(tasks, ctx.max_concurrent).await;
        Ok(ModuleOutcome::new(
            format!("described {total} account/region pairs"),
            results,
        ))
    }
}

/// Map a configured module kind to its handler.
pub fn handler_for_kind(kind: &str, module_name: &str) -> Result<Arc<dyn ModuleHandler>> {
    match kind {
        "describe" => Ok(Arc::new(DescribeHandler {
            module_name: module_name.to_string(),
        })),
        other => Err(StrataError::UnknownModuleKind(other.to_string())),
    }
}

/// Build the immutable stage graph from configuration, resolving every
/// module kind against the registry.
pub fn build_graph(config: &OrgConfig) -> Result<StageGraph> {
    let mut stages = Vec::new();
    for stage_cfg in &config.pipeline.stages {
        let mut modules = Vec::new();
        for module_cfg in &stage_cfg.modules {
            modules.push(Module {
                name: module_cfg.name.clone(),
                run_order: module_cfg.run_order,
                target: module_cfg.target.clone(),
                on_error: module_cfg.on_error,
                handler: handler_for_kind(&module_cfg.kind, &module_cfg.name)?,
            });
        }
        stages.push(Stage {
            name: stage_cfg.name.clone(),
            run_order: stage_cfg.run_order,
            modules,
        });
    }
    StageGraph::new(stages)
}

// ---------------------------------------------------------------------------
// OfflineAssumer
// ---------------------------------------------------------------------------

/// Mints process-local placeholder credentials for the built-in
/// non-mutating handlers. A cloud binding replaces this with an
/// `sts:AssumeRole` implementation.
pub struct OfflineAssumer;

#[async_trait]
impl RoleAssumer for OfflineAssumer {
    async fn assume_role(
        &self,
        account_id: &str,
        _region: &str,
        role_name: &str,
    ) -> Result<Credential> {
        Ok(Credential {
            access_key_id: format!("OFFLINE{account_id}"),
            secret_access_key: "offline".into(),
            session_token: format!("offline-{role_name}"),
            expiration: Utc::now() + Duration::hours(1),
        })
    }
}

pub fn offline_credential() -> Credential {
    Credential {
        access_key_id: "OFFLINECALLER".into(),
        secret_access_key: "offline".into(),
        session_token: "offline-caller".into(),
        expiration: Utc::now() + Duration::hours(1),
    }
}
