//! Stage and module registry.
//!
//! The graph is built once at process start, validated, and passed by
//! reference into the orchestrator; it never mutates afterwards.

use crate::credentials::Credential;
use crate::error::{Result, StrataError};
use crate::report::ModuleOutcome;
use crate::target::DeploymentTarget;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// ModuleHandler / ModuleContext
// ---------------------------------------------------------------------------

/// Everything a handler gets for one execution: targets already resolved,
/// credentials already bound per account.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub account_ids: Vec<String>,
    pub regions: Vec<String>,
    pub credentials_by_account: HashMap<String, Credential>,
    /// When set, the handler must perform no mutating remote call and
    /// return a descriptive no-op outcome instead.
    pub dry_run: bool,
    pub max_concurrent: usize,
}

/// The work a module performs across its resolved accounts.
///
/// Returning `Err` is stage-fatal and aborts the pipeline; per-account
/// failures belong in the outcome's results instead.
#[async_trait]
pub trait ModuleHandler: Send + Sync {
    async fn execute(&self, ctx: &ModuleContext) -> Result<ModuleOutcome>;
}

// ---------------------------------------------------------------------------
// Module / Stage
// ---------------------------------------------------------------------------

/// What embedded per-account failures in a completed outcome mean for the
/// rest of the pipeline. Explicit per module rather than inferred from the
/// outcome text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failures in the report and keep going.
    #[default]
    Continue,
    /// Treat any per-account failure as stage-fatal.
    Abort,
}

#[derive(Clone)]
pub struct Module {
    pub name: String,
    pub run_order: u32,
    pub target: DeploymentTarget,
    pub on_error: FailurePolicy,
    pub handler: Arc<dyn ModuleHandler>,
}

#[derive(Clone)]
pub struct Stage {
    pub name: String,
    pub run_order: u32,
    pub modules: Vec<Module>,
}

// ---------------------------------------------------------------------------
// StageGraph
// ---------------------------------------------------------------------------

/// Ordered, immutable registry of stages.
pub struct StageGraph {
    stages: Vec<Stage>,
}

impl StageGraph {
    /// Validate and order the registry. Stage run-order ties are a
    /// configuration error; module ties within a stage are the concurrency
    /// grouping mechanism and are allowed.
    pub fn new(mut stages: Vec<Stage>) -> Result<Self> {
        if stages.is_empty() {
            return Err(StrataError::EmptyPipeline);
        }
        stages.sort_by_key(|s| s.run_order);
        for pair in stages.windows(2) {
            if pair[0].run_order == pair[1].run_order {
                return Err(StrataError::DuplicateStageOrder {
                    first: pair[0].name.clone(),
                    second: pair[1].name.clone(),
                    run_order: pair[0].run_order,
                });
            }
        }
        for stage in &stages {
            if stage.modules.is_empty() {
                return Err(StrataError::EmptyStage(stage.name.clone()));
            }
        }
        Ok(Self { stages })
    }

    /// Stages in strictly ascending run order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// A stage's modules partitioned into run-order groups, ascending.
    /// Modules sharing a group may execute concurrently; a later group
    /// starts only after the prior group has fully settled.
    pub fn run_order_groups(stage: &Stage) -> Vec<Vec<&Module>> {
        let mut by_order: Vec<(u32, Vec<&Module>)> = Vec::new();
        let mut sorted: Vec<&Module> = stage.modules.iter().collect();
        sorted.sort_by_key(|m| m.run_order);
        for module in sorted {
            match by_order.last_mut() {
                Some((order, group)) if *order == module.run_order => group.push(module),
                _ => by_order.push((module.run_order, vec![module])),
            }
        }
        by_order.into_iter().map(|(_, group)| group).collect()
    }
}
