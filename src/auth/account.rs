//! The host's OAuth account record and the store it lives in.

use crate::errors::AuthenticationError;
use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Provider id of Google accounts in the host store.
pub const GOOGLE_PROVIDER: &str = "google";

/// A linked OAuth account, owned by the host.
#[derive(Debug, Clone)]
pub struct OAuthAccount {
    /// Host user the account belongs to.
    pub user_id: i64,

    /// Provider id, `"google"` for this connector.
    pub provider_type: String,

    /// Serialized token blob, see [`super::StoredAccessToken`].
    pub access_token: String,

    /// Long-lived refresh token.
    pub refresh_token: SecretString,

    /// Granted scope names.
    pub scopes: String,
}

impl OAuthAccount {
    /// Creates a Google account record for `user_id`.
    pub fn new(
        user_id: i64,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            provider_type: GOOGLE_PROVIDER.to_string(),
            access_token: access_token.into(),
            refresh_token: SecretString::new(refresh_token.into()),
            scopes: String::new(),
        }
    }

    /// Sets the granted scope names.
    pub fn with_scopes(mut self, scopes: impl Into<String>) -> Self {
        self.scopes = scopes.into();
        self
    }

    /// Returns true if `scope` was granted on this account.
    pub fn has_scope(&self, scope: &str) -> bool {
        scope_list_contains(&self.scopes, scope)
    }
}

/// Returns true if a host scope list, separated by whitespace or `|`,
/// contains `scope`.
pub fn scope_list_contains(scopes: &str, scope: &str) -> bool {
    scopes
        .split(|c: char| c.is_whitespace() || c == '|')
        .any(|s| !s.is_empty() && s == scope)
}

/// Seam to the host's OAuth account storage.
#[async_trait]
pub trait OAuthAccountStore: Send + Sync {
    /// Loads the account of `user_id` for `provider`.
    async fn get_account(
        &self,
        user_id: i64,
        provider: &str,
    ) -> Result<Option<OAuthAccount>, AuthenticationError>;

    /// Persists an updated account.
    async fn update_account(&self, account: &OAuthAccount) -> Result<(), AuthenticationError>;
}

/// In-memory account store.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<(i64, String), OAuthAccount>>,
}

impl InMemoryAccountStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an account.
    pub async fn insert(&self, account: OAuthAccount) {
        let key = (account.user_id, account.provider_type.clone());
        self.accounts.write().await.insert(key, account);
    }
}

#[async_trait]
impl OAuthAccountStore for InMemoryAccountStore {
    async fn get_account(
        &self,
        user_id: i64,
        provider: &str,
    ) -> Result<Option<OAuthAccount>, AuthenticationError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&(user_id, provider.to_string())).cloned())
    }

    async fn update_account(&self, account: &OAuthAccount) -> Result<(), AuthenticationError> {
        let mut accounts = self.accounts.write().await;
        let key = (account.user_id, account.provider_type.clone());
        match accounts.get_mut(&key) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            }
            None => Err(AuthenticationError::AccountStore(format!(
                "no {} account for user {}",
                account.provider_type, account.user_id
            ))),
        }
    }
}
