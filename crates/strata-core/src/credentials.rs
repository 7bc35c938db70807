//! Short-lived delegated credentials for cross-account actions.
//!
//! The broker never caches and never retries: a credential failure is
//! frequently non-transient (wrong role name, account not bootstrapped), so
//! retry, if wanted, is the caller's decision via [`crate::retry`].

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// A delegated credential scoped to one account+region, passed by value into
/// a single action invocation and never persisted.
#[derive(Clone)]
pub struct Credential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime<Utc>,
}

impl Credential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }
}

// Debug must not leak the secret into logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RoleAssumer
// ---------------------------------------------------------------------------

/// The `sts:AssumeRole`-shaped call the broker delegates to. Implemented by
/// the cloud binding in production and by stubs in tests.
#[async_trait]
pub trait RoleAssumer: Send + Sync {
    async fn assume_role(
        &self,
        account_id: &str,
        region: &str,
        role_name: &str,
    ) -> Result<Credential>;
}

// ---------------------------------------------------------------------------
// CredentialBroker
// ---------------------------------------------------------------------------

/// Exchanges a target account id for delegated credentials.
pub struct CredentialBroker {
    caller_account_id: String,
    caller_credentials: Credential,
    assumer: Arc<dyn RoleAssumer>,
}

impl CredentialBroker {
    pub fn new(
        caller_account_id: impl Into<String>,
        caller_credentials: Credential,
        assumer: Arc<dyn RoleAssumer>,
    ) -> Self {
        Self {
            caller_account_id: caller_account_id.into(),
            caller_credentials,
            assumer,
        }
    }

    pub fn caller_account_id(&self) -> &str {
        &self.caller_account_id
    }

    /// Credentials for `account_id` in `region`.
    ///
    /// The caller's own account short-circuits to the caller's credentials
    /// with no network call. Assume failures surface unretried as
    /// [`crate::StrataError::Credential`].
    pub async fn get_credentials(
        &self,
        account_id: &str,
        region: &str,
        role_name: &str,
    ) -> Result<Credential> {
        if account_id == self.caller_account_id {
            return Ok(self.caller_credentials.clone());
        }
        self.assumer.assume_role(account_id, region, role_name).await
    }
}
