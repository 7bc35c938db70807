//! Typed YAML configuration: the organization's accounts and the pipeline
//! definition. Parsed once at process start; everything downstream receives
//! immutable views.

use crate::directory::{Account, AccountDirectory};
use crate::error::Result;
use crate::stage::FailurePolicy;
use crate::target::DeploymentTarget;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Organization section
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub email: String,
    /// `/`-separated OU path rooted at `Root`.
    #[serde(default = "default_ou_path")]
    pub organizational_unit: String,
}

fn default_ou_path() -> String {
    "Root".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub accounts: Vec<AccountConfig>,
    /// OU names that exist but hold no accounts yet; merged into the
    /// known-OU set so targets referencing them validate.
    #[serde(default)]
    pub organizational_units: Vec<String>,
}

// ---------------------------------------------------------------------------
// Pipeline section
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    #[serde(default = "default_run_order")]
    pub run_order: u32,
    /// Handler kind, resolved against the binary's handler registry.
    pub kind: String,
    #[serde(default)]
    pub on_error: FailurePolicy,
    #[serde(default)]
    pub target: DeploymentTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    #[serde(default = "default_run_order")]
    pub run_order: u32,
    pub modules: Vec<ModuleConfig>,
}

fn default_run_order() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub stages: Vec<StageConfig>,
}

// ---------------------------------------------------------------------------
// OrgConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgConfig {
    pub organization: OrganizationConfig,
    /// Name of the account the pipeline itself runs in. Defaults to the
    /// first configured account.
    #[serde(default)]
    pub management_account: Option<String>,
    #[serde(default = "default_role_name")]
    pub assume_role_name: String,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    pub pipeline: PipelineConfig,
}

fn default_role_name() -> String {
    "StrataDeploymentRole".to_string()
}

fn default_max_concurrent() -> usize {
    4
}

impl OrgConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: OrgConfig = serde_yaml::from_str(&raw)?;
        Ok(config)
    }

    /// Build the immutable account directory from the organization section.
    pub fn directory(&self) -> Result<AccountDirectory> {
        let accounts = self
            .organization
            .accounts
            .iter()
            .map(|a| Account {
                id: a.id.clone(),
                name: a.name.clone(),
                email: a.email.clone(),
                ou_path: a.organizational_unit.clone(),
            })
            .collect();
        AccountDirectory::new(accounts, self.organization.organizational_units.clone())
    }

    /// The management account's name, falling back to the first account.
    pub fn management_account_name(&self) -> Option<&str> {
        self.management_account
            .as_deref()
            .or_else(|| self.organization.accounts.first().map(|a| a.name.as_str()))
    }

    /// Non-fatal consistency checks, surfaced before a run starts.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.regions.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "no regions configured; every module will be a no-op".into(),
            });
        }

        if self.max_concurrent == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "max_concurrent must be at least 1".into(),
            });
        }

        if let Some(name) = &self.management_account {
            if !self.organization.accounts.iter().any(|a| &a.name == name) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("management_account '{name}' is not a configured account"),
                });
            }
        }

        for account in &self.organization.accounts {
            if account.email.is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("account '{}' has no email", account.name),
                });
            }
            if account.id.len() != 12 || !account.id.chars().all(|c| c.is_ascii_digit()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "account '{}' id '{}' is not a 12-digit account id",
                        account.name, account.id
                    ),
                });
            }
        }

        for stage in &self.pipeline.stages {
            let mut seen = HashSet::new();
            for module in &stage.modules {
                if !seen.insert(module.name.as_str()) {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!(
                            "stage '{}' defines module '{}' more than once",
                            stage.name, module.name
                        ),
                    });
                }
            }
        }

        warnings
    }
}
