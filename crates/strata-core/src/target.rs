//! Deployment-target policy evaluation.
//!
//! A [`DeploymentTarget`] declares where a module applies: named accounts,
//! organizational units (hierarchical, with `Root` matching everything),
//! and explicit account/region exclusions. [`TargetResolver`] evaluates the
//! policy against the [`AccountDirectory`] with a fixed precedence —
//! explicit deny, then explicit allow, then implicit deny — so an exclusion
//! always wins no matter how the account was included.

use crate::directory::{AccountDirectory, ROOT_OU};
use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// DeploymentTarget
// ---------------------------------------------------------------------------

/// Declarative include/exclude policy attached to a module. Never mutated
/// after parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentTarget {
    /// Account names to include.
    #[serde(default)]
    pub accounts: Vec<String>,
    /// OU names to include. `Root` matches every account; any other name
    /// also matches accounts in sub-OUs beneath it.
    #[serde(default)]
    pub organizational_units: Vec<String>,
    /// Account names excluded regardless of how they were included.
    #[serde(default)]
    pub excluded_accounts: Vec<String>,
    /// Regions in which this target never applies.
    #[serde(default)]
    pub excluded_regions: Vec<String>,
}

/// The concrete account-id set a target resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTargetSet {
    pub account_ids: BTreeSet<String>,
}

impl ResolvedTargetSet {
    pub fn is_empty(&self) -> bool {
        self.account_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.account_ids.len()
    }
}

// ---------------------------------------------------------------------------
// TargetResolver
// ---------------------------------------------------------------------------

/// Evaluates deployment targets against the account directory.
pub struct TargetResolver<'a> {
    directory: &'a AccountDirectory,
}

impl<'a> TargetResolver<'a> {
    pub fn new(directory: &'a AccountDirectory) -> Self {
        Self { directory }
    }

    /// Reject unknown account or OU names before any network call is made.
    pub fn validate(&self, target: &DeploymentTarget) -> Result<()> {
        for name in target.accounts.iter().chain(&target.excluded_accounts) {
            if self.directory.by_name(name).is_none() {
                return Err(StrataError::UnknownAccount(name.clone()));
            }
        }
        for ou in &target.organizational_units {
            if !self.directory.is_known_ou(ou) {
                return Err(StrataError::UnknownOrganizationalUnit(ou.clone()));
            }
        }
        Ok(())
    }

    /// Membership test: does `target` include `account_id` in `region`?
    ///
    /// Precedence is fixed: explicit region deny, explicit account deny,
    /// explicit allow (named account / `Root` / hierarchical OU), implicit
    /// deny. Deny always wins over allow.
    pub fn resolve(&self, target: &DeploymentTarget, account_id: &str, region: &str) -> Result<bool> {
        self.validate(target)?;

        if target.excluded_regions.iter().any(|r| r == region) {
            return Ok(false);
        }

        let Some(account) = self.directory.by_id(account_id) else {
            return Ok(false);
        };
        self.included(target, account)
    }

    /// Enumerate every directory account the target includes, deduplicated
    /// by id. An account reachable via both a named entry and an OU entry
    /// appears once; empty include lists resolve to the empty set.
    pub fn resolve_all(&self, target: &DeploymentTarget) -> Result<ResolvedTargetSet> {
        self.validate(target)?;

        // Region deny is per-invocation context; enumeration covers the
        // account dimension only.
        let mut account_ids = BTreeSet::new();
        for account in self.directory.accounts() {
            if self.included(target, account)? {
                account_ids.insert(account.id.clone());
            }
        }
        Ok(ResolvedTargetSet { account_ids })
    }

    /// The account-dimension test shared by `resolve` and `resolve_all`.
    fn included(&self, target: &DeploymentTarget, account: &crate::directory::Account) -> Result<bool> {
        for name in &target.excluded_accounts {
            if self.directory.account_id(name)? == account.id {
                return Ok(false);
            }
        }
        for name in &target.accounts {
            if self.directory.account_id(name)? == account.id {
                return Ok(true);
            }
        }
        for ou in &target.organizational_units {
            if ou == ROOT_OU || account.in_organizational_unit(ou) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Account;

    fn directory() -> AccountDirectory {
        let accounts = vec![
            Account {
                id: "111".into(),
                name: "X".into(),
                email: "x@example.com".into(),
                ou_path: "Root/Infra".into(),
            },
            Account {
                id: "222".into(),
                name: "Y".into(),
                email: "y@example.com".into(),
                ou_path: "Root/Infra".into(),
            },
            Account {
                id: "333".into(),
                name: "Z".into(),
                email: "z@example.com".into(),
                ou_path: "Root/Sandbox".into(),
            },
        ];
        AccountDirectory::new(accounts, []).unwrap()
    }

    fn ids(set: &ResolvedTargetSet) -> Vec<&str> {
        set.account_ids.iter().map(String::as_str).collect()
    }

    #[test]
    fn named_account_resolves() {
        let dir = directory();
        let resolver = TargetResolver::new(&dir);
        let target = DeploymentTarget {
            accounts: vec!["X".into()],
            ..Default::default()
        };
        let set = resolver.resolve_all(&target).unwrap();
        assert_eq!(ids(&set), vec!["111"]);
    }

    #[test]
    fn deny_wins_over_allow() {
        let dir = directory();
        let resolver = TargetResolver::new(&dir);
        let target = DeploymentTarget {
            accounts: vec!["X".into()],
            excluded_accounts: vec!["X".into()],
            ..Default::default()
        };
        assert!(!resolver.resolve(&target, "111", "us-east-1").unwrap());
        assert!(resolver.resolve_all(&target).unwrap().is_empty());
    }

    #[test]
    fn excluded_account_dropped_even_when_ou_matched() {
        let dir = directory();
        let resolver = TargetResolver::new(&dir);
        let target = DeploymentTarget {
            organizational_units: vec!["Infra".into()],
            excluded_accounts: vec!["Y".into()],
            ..Default::default()
        };
        let set = resolver.resolve_all(&target).unwrap();
        assert_eq!(ids(&set), vec!["111"]);
    }

    #[test]
    fn root_ou_matches_every_account() {
        let dir = directory();
        let resolver = TargetResolver::new(&dir);
        let target = DeploymentTarget {
            organizational_units: vec!["Root".into()],
            ..Default::default()
        };
        let set = resolver.resolve_all(&target).unwrap();
        assert_eq!(ids(&set), vec!["111", "222", "333"]);
    }

    #[test]
    fn excluded_region_denies_membership() {
        let dir = directory();
        let resolver = TargetResolver::new(&dir);
        let target = DeploymentTarget {
            organizational_units: vec!["Root".into()],
            excluded_regions: vec!["eu-west-1".into()],
            ..Default::default()
        };
        assert!(resolver.resolve(&target, "111", "us-east-1").unwrap());
        assert!(!resolver.resolve(&target, "111", "eu-west-1").unwrap());
    }

    #[test]
    fn empty_target_resolves_to_empty_set() {
        let dir = directory();
        let resolver = TargetResolver::new(&dir);
        let set = resolver.resolve_all(&DeploymentTarget::default()).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn duplicate_inclusion_deduplicated() {
        let dir = directory();
        let resolver = TargetResolver::new(&dir);
        // X reachable both by name and via its OU.
        let target = DeploymentTarget {
            accounts: vec!["X".into()],
            organizational_units: vec!["Infra".into()],
            ..Default::default()
        };
        let set = resolver.resolve_all(&target).unwrap();
        assert_eq!(ids(&set), vec!["111", "222"]);
    }

    #[test]
    fn enumeration_is_idempotent() {
        let dir = directory();
        let resolver = TargetResolver::new(&dir);
        let target = DeploymentTarget {
            organizational_units: vec!["Infra".into()],
            ..Default::default()
        };
        let first = resolver.resolve_all(&target).unwrap();
        let second = resolver.resolve_all(&target).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_account_name_is_configuration_error() {
        let dir = directory();
        let resolver = TargetResolver::new(&dir);
        let target = DeploymentTarget {
            accounts: vec!["missing".into()],
            ..Default::default()
        };
        assert!(matches!(
            resolver.resolve_all(&target),
            Err(StrataError::UnknownAccount(_))
        ));
    }

    #[test]
    fn unknown_ou_name_is_configuration_error() {
        let dir = directory();
        let resolver = TargetResolver::new(&dir);
        let target = DeploymentTarget {
            organizational_units: vec!["Ghost".into()],
            ..Default::default()
        };
        assert!(matches!(
            resolver.resolve_all(&target),
            Err(StrataError::UnknownOrganizationalUnit(_))
        ));
    }
}
