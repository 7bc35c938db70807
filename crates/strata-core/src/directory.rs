//! Read-only view of the organization's accounts and OU hierarchy.
//!
//! Loaded once per run from configuration and shared by reference across
//! every concurrently executing task; nothing here mutates after `new`.

use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// The name of the organization root OU. A deployment target listing it
/// matches every account unconditionally.
pub const ROOT_OU: &str = "Root";

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// One member account of the organization. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    /// `/`-separated OU path rooted at `Root`, e.g. `Root/Infra/Prod`.
    pub ou_path: String,
}

impl Account {
    /// Whether this account sits in `ou` or in any sub-OU beneath it.
    ///
    /// Matching is per path segment: OU `Infra` contains `Root/Infra` and
    /// `Root/Infra/Prod`, but not `Root/Infrastructure`.
    pub fn in_organizational_unit(&self, ou: &str) -> bool {
        if ou == ROOT_OU {
            return true;
        }
        self.ou_path.split('/').any(|segment| segment == ou)
    }
}

// ---------------------------------------------------------------------------
// AccountDirectory
// ---------------------------------------------------------------------------

/// Directory of all organization accounts, indexed by name and id.
#[derive(Debug, Clone)]
pub struct AccountDirectory {
    accounts: Vec<Account>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
    known_ous: BTreeSet<String>,
}

impl AccountDirectory {
    /// Build the directory, rejecting duplicate names or ids.
    ///
    /// The known-OU set is derived from every path segment that appears in
    /// an account's `ou_path`, so target validation can distinguish a typo
    /// from an intentionally empty OU only when the OU holds at least one
    /// account. Extra OU names declared in config are merged in by the
    /// loader before this is called.
    pub fn new(accounts: Vec<Account>, extra_ous: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut by_name = HashMap::new();
        let mut by_id = HashMap::new();
        let mut known_ous: BTreeSet<String> = extra_ous.into_iter().collect();
        known_ous.insert(ROOT_OU.to_string());

        for (idx, account) in accounts.iter().enumerate() {
            if by_name.insert(account.name.clone(), idx).is_some() {
                return Err(StrataError::DuplicateAccount(account.name.clone()));
            }
            if by_id.insert(account.id.clone(), idx).is_some() {
                return Err(StrataError::DuplicateAccountId(account.id.clone()));
            }
            for segment in account.ou_path.split('/') {
                if !segment.is_empty() {
                    known_ous.insert(segment.to_string());
                }
            }
        }

        Ok(Self {
            accounts,
            by_name,
            by_id,
            known_ous,
        })
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn by_name(&self, name: &str) -> Option<&Account> {
        self.by_name.get(name).map(|&idx| &self.accounts[idx])
    }

    pub fn by_id(&self, id: &str) -> Option<&Account> {
        self.by_id.get(id).map(|&idx| &self.accounts[idx])
    }

    /// Resolve a configured account name to its id.
    pub fn account_id(&self, name: &str) -> Result<&str> {
        self.by_name(name)
            .map(|a| a.id.as_str())
            .ok_or_else(|| StrataError::UnknownAccount(name.to_string()))
    }

    pub fn is_known_ou(&self, name: &str) -> bool {
        self.known_ous.contains(name)
    }
}
