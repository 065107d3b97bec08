//! [`AuthProvider`] backed by a stored OAuth account.

use super::{AccessToken, AuthProvider, OAuthAccount, OAuthAccountStore, StoredAccessToken, TokenRefresher};
use crate::errors::AuthenticationError;
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Serves access tokens from an [`OAuthAccount`], refreshing through the
/// token endpoint and writing every refreshed token back to the store.
///
/// Refreshes on one provider are serialized by the account lock. Two
/// providers for the same user race at the store and the last write wins.
pub struct AccountTokenProvider {
    refresher: TokenRefresher,
    store: Arc<dyn OAuthAccountStore>,
    account: Mutex<OAuthAccount>,
    cached: RwLock<Option<StoredAccessToken>>,
}

impl AccountTokenProvider {
    /// Creates a provider for `account`.
    pub fn new(
        refresher: TokenRefresher,
        store: Arc<dyn OAuthAccountStore>,
        account: OAuthAccount,
    ) -> Self {
        Self {
            refresher,
            store,
            account: Mutex::new(account),
            cached: RwLock::new(None),
        }
    }

    /// Installs the stored token, refreshing when it cannot be parsed or has
    /// expired.
    pub async fn install(&self) -> Result<AccessToken, AuthenticationError> {
        let stored = {
            let account = self.account.lock().await;
            StoredAccessToken::parse(&account.access_token)
        };

        match stored {
            Ok(token) if !token.is_expired() => {
                let access = token.to_access_token();
                *self.cached.write().await = Some(token);
                Ok(access)
            }
            Ok(_) => {
                debug!("Stored access token expired");
                self.refresh_token().await
            }
            Err(e) => {
                debug!(error = %e, "Stored access token unusable");
                self.refresh_token().await
            }
        }
    }
}

#[async_trait]
impl AuthProvider for AccountTokenProvider {
    async fn get_access_token(&self) -> Result<AccessToken, AuthenticationError> {
        let installed = {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
                return Ok(token.to_access_token());
            }
            cached.is_some()
        };

        if installed {
            self.refresh_token().await
        } else {
            self.install().await
        }
    }

    async fn refresh_token(&self) -> Result<AccessToken, AuthenticationError> {
        let mut account = self.account.lock().await;

        let mut token = self.refresher.refresh(&account.refresh_token).await?;
        if let Some(rotated) = token.refresh_token.take() {
            account.refresh_token = SecretString::new(rotated);
        }
        account.access_token = token.to_json()?;

        match self.store.update_account(&account).await {
            Ok(()) => info!(user_id = account.user_id, "Refreshed and persisted access token"),
            Err(e) => warn!(
                user_id = account.user_id,
                error = %e,
                "Failed to persist refreshed access token"
            ),
        }

        let access = token.to_access_token();
        *self.cached.write().await = Some(token);
        Ok(access)
    }

    fn is_expired(&self) -> bool {
        match self.cached.try_read() {
            Ok(cached) => cached.as_ref().map(|t| t.is_expired()).unwrap_or(true),
            // A writer holds the lock, so a refresh is in flight.
            Err(_) => true,
        }
    }
}
