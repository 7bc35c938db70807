//! Typed execution reports.
//!
//! Every aggregation level is a tagged, serializable value rather than a
//! status string, so "completed with per-account failures" and "stage
//! fatal" stay distinct and testable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ActionResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Failure,
}

/// Outcome of one leaf action in one account+region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub account: String,
    pub region: String,
    pub status: ActionStatus,
    pub message: String,
}

impl ActionResult {
    pub fn success(
        account: impl Into<String>,
        region: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
            status: ActionStatus::Success,
            message: message.into(),
        }
    }

    pub fn failure(
        account: impl Into<String>,
        region: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
            status: ActionStatus::Failure,
            message: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == ActionStatus::Failure
    }
}

// ---------------------------------------------------------------------------
// ModuleOutcome / ModuleReport
// ---------------------------------------------------------------------------

/// What a module handler returns on a non-fatal completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOutcome {
    pub summary: String,
    #[serde(default)]
    pub results: Vec<ActionResult>,
}

impl ModuleOutcome {
    pub fn new(summary: impl Into<String>, results: Vec<ActionResult>) -> Self {
        Self {
            summary: summary.into(),
            results,
        }
    }

    pub fn failed_accounts(&self) -> impl Iterator<Item = &ActionResult> {
        self.results.iter().filter(|r| r.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(ActionResult::is_failure)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModuleStatus {
    /// Handler completed; per-account failures, if any, are in the results.
    Completed { outcome: ModuleOutcome },
    /// Handler returned an error; the pipeline aborts after the current
    /// run-order group settles.
    Fatal { reason: String },
    /// A prior module aborted the pipeline before this one was dispatched.
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleReport {
    pub module: String,
    pub run_order: u32,
    #[serde(flatten)]
    pub status: ModuleStatus,
}

impl ModuleReport {
    pub fn is_fatal(&self) -> bool {
        matches!(self.status, ModuleStatus::Fatal { .. })
    }
}

// ---------------------------------------------------------------------------
// StageReport / PipelineReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub run_order: u32,
    pub modules: Vec<ModuleReport>,
}

/// Terminal state of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Completed,
    Aborted { stage: String, module: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    #[serde(flatten)]
    pub state: PipelineState,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    pub fn action_results(&self) -> impl Iterator<Item = &ActionResult> {
        self.stages
            .iter()
            .flat_map(|s| &s.modules)
            .filter_map(|m| match &m.status {
                ModuleStatus::Completed { outcome } => Some(outcome.results.iter()),
                _ => None,
            })
            .flatten()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            PipelineState::Completed => writeln!(f, "pipeline {} completed", self.run_id)?,
            PipelineState::Aborted { stage, module } => writeln!(
                f,
                "pipeline {} ABORTED in stage '{stage}' by module '{module}'",
                self.run_id
            )?,
        }
        for stage in &self.stages {
            writeln!(f, "  stage {} (run order {})", stage.stage, stage.run_order)?;
            for module in &stage.modules {
                match &module.status {
                    ModuleStatus::Completed { outcome } => {
                        let failed = outcome.failed_accounts().count();
                        writeln!(
                            f,
                            "    {}: {} ({} accounts, {} failed)",
                            module.module,
                            outcome.summary,
                            outcome.results.len(),
                            failed
                        )?;
                        for result in outcome.failed_accounts() {
                            writeln!(
                                f,
                                "      {} [{}]: {}",
                                result.account, result.region, result.message
                            )?;
                        }
                    }
                    ModuleStatus::Fatal { reason } => {
                        writeln!(f, "    {}: FATAL: {reason}", module.module)?;
                    }
                    ModuleStatus::Skipped => {
                        writeln!(f, "    {}: skipped", module.module)?;
                    }
                }
            }
        }
        Ok(())
    }
}
