//! [`DriveConnector`], the `"google"` storage provider.
//!
//! One connector serves one host user. It resolves the user's linked Google
//! account into a [`GoogleDriveClient`] on first use and caches it until a
//! token problem invalidates it.

mod content;
mod links;
mod listing;
mod mutations;

use crate::auth::{
    scopes, AccountTokenProvider, OAuthAccount, OAuthAccountStore, TokenRefresher, GOOGLE_PROVIDER,
};
use crate::client::GoogleDriveClient;
use crate::config::GoogleDriveConfig;
use crate::errors::{ConnectorError, ConnectorResult, GoogleDriveError, GoogleDriveResult, UnavailableReason};
use crate::mapping::{GenericFileItem, MappingContext, STORAGE_TYPE};
use crate::provider::{
    BatchOutcome, CreateFolderArgs, DeleteArgs, FileArgs, FileContent, LinkArgs, ListArgs,
    ListResponse, Quota, QuotaArgs, RenameArgs, StorageDescriptor, StorageProvider, TransferArgs,
    UploadArgs, UserContext,
};
use crate::settings::{check_enabled, ModuleSettings, ProviderSettings, STORAGE_SCOPE};
use crate::transport::{HttpTransport, ReqwestTransport};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Name the host shows for this storage.
pub const DISPLAY_NAME: &str = "Google Drive";

/// Folder id Drive accepts for the user's root.
pub const ROOT_FOLDER: &str = "root";

/// Google Drive storage provider for one host user.
pub struct DriveConnector {
    config: GoogleDriveConfig,
    provider_settings: ProviderSettings,
    module_settings: ModuleSettings,
    user: UserContext,
    accounts: Arc<dyn OAuthAccountStore>,
    transport: Arc<dyn HttpTransport>,
    client: RwLock<Option<Arc<GoogleDriveClient>>>,
}

impl DriveConnector {
    /// Creates a connector with a reqwest transport built from `config`.
    pub fn new(
        config: GoogleDriveConfig,
        provider_settings: ProviderSettings,
        module_settings: ModuleSettings,
        user: UserContext,
        accounts: Arc<dyn OAuthAccountStore>,
    ) -> GoogleDriveResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::from_config(&config).map_err(|e| {
            GoogleDriveError::configuration(format!("Failed to create transport: {}", e))
        })?;
        Ok(Self::with_transport(
            config,
            provider_settings,
            module_settings,
            user,
            accounts,
            Arc::new(transport),
        ))
    }

    /// Creates a connector over an existing transport.
    pub fn with_transport(
        config: GoogleDriveConfig,
        provider_settings: ProviderSettings,
        module_settings: ModuleSettings,
        user: UserContext,
        accounts: Arc<dyn OAuthAccountStore>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            config,
            provider_settings,
            module_settings,
            user,
            accounts,
            transport,
            client: RwLock::new(None),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &GoogleDriveConfig {
        &self.config
    }

    /// The user this connector acts for.
    pub fn user(&self) -> UserContext {
        self.user
    }

    /// Returns the cached client, building it on first use.
    ///
    /// Every failure along the way, including a failed token refresh,
    /// surfaces as [`ConnectorError::Unavailable`].
    pub async fn client(&self) -> ConnectorResult<Arc<GoogleDriveClient>> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.client.write().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = Arc::new(self.build_client().await?);
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Drops the cached client; the next call builds a new one.
    pub async fn invalidate_client(&self) {
        if self.client.write().await.take().is_some() {
            debug!(user_id = self.user.user_id, "Drive client invalidated");
        }
    }

    async fn build_client(&self) -> Result<GoogleDriveClient, UnavailableReason> {
        check_enabled(&self.provider_settings, &self.module_settings)?;
        let account = self.linked_account().await?;

        let refresher = TokenRefresher::new(
            self.transport.clone(),
            self.config.token_url.clone(),
            self.provider_settings.client_id.clone(),
            self.provider_settings.client_secret.clone(),
        )
        .with_scopes(&scopes::CLIENT_SCOPES);
        let auth = Arc::new(AccountTokenProvider::new(
            refresher,
            self.accounts.clone(),
            account,
        ));

        auth.install().await.map_err(|e| {
            warn!(user_id = self.user.user_id, error = %e, "No usable Drive access token");
            UnavailableReason::TokenUnavailable(e.to_string())
        })?;

        GoogleDriveClient::with_transport(self.config.clone(), self.transport.clone(), auth)
            .map_err(|e| UnavailableReason::ClientConstruction(e.to_string()))
    }

    /// Loads the user's Google account and checks its storage grant.
    async fn linked_account(&self) -> Result<OAuthAccount, UnavailableReason> {
        let user_id = self.user.user_id;
        let account = self
            .accounts
            .get_account(user_id, GOOGLE_PROVIDER)
            .await
            .map_err(|e| {
                warn!(user_id, error = %e, "Account lookup failed");
                UnavailableReason::NoAccount(user_id)
            })?
            .filter(|account| account.provider_type == GOOGLE_PROVIDER)
            .ok_or(UnavailableReason::NoAccount(user_id))?;

        if !account.has_scope(STORAGE_SCOPE) {
            return Err(UnavailableReason::ScopeNotGranted("account".to_string()));
        }
        Ok(account)
    }

    fn ensure_type(&self, storage_type: &str) -> ConnectorResult<()> {
        if storage_type == STORAGE_TYPE {
            Ok(())
        } else {
            Err(UnavailableReason::UnsupportedType(storage_type.to_string()).into())
        }
    }

    fn mapping_context(&self) -> MappingContext {
        MappingContext {
            user_id: self.user.user_id,
            thumbnail_mode: self.config.thumbnail_mode,
            last_modified_source: self.config.last_modified_source,
        }
    }

    /// Runs a Drive call, turning token failures into unavailability.
    async fn remote<T>(
        &self,
        call: impl Future<Output = GoogleDriveResult<T>>,
    ) -> ConnectorResult<T> {
        match call.await {
            Ok(value) => Ok(value),
            Err(error) => Err(self.remote_error(error).await),
        }
    }

    async fn remote_error(&self, error: GoogleDriveError) -> ConnectorError {
        match error {
            GoogleDriveError::Authentication(e) => {
                warn!(user_id = self.user.user_id, error = %e, "Drive credentials rejected");
                self.invalidate_client().await;
                UnavailableReason::TokenUnavailable(e.to_string()).into()
            }
            other => ConnectorError::Remote(other),
        }
    }
}

/// Folder id addressed by a host path: its last segment, or `root`.
pub(crate) fn folder_id(path: &str) -> String {
    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    if segment.is_empty() {
        ROOT_FOLDER.to_string()
    } else {
        segment.to_string()
    }
}

impl std::fmt::Debug for DriveConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveConnector")
            .field("user", &self.user)
            .field("base_url", &self.config.base_url.as_str())
            .finish()
    }
}

#[async_trait]
impl StorageProvider for DriveConnector {
    fn storage_type(&self) -> &str {
        STORAGE_TYPE
    }

    async fn storage_descriptor(&self) -> Option<StorageDescriptor> {
        if let Err(reason) = check_enabled(&self.provider_settings, &self.module_settings) {
            debug!(%reason, "Drive storage not offered");
            return None;
        }
        if let Err(reason) = self.linked_account().await {
            debug!(%reason, "Drive storage not offered");
            return None;
        }
        Some(StorageDescriptor {
            storage_type: STORAGE_TYPE.to_string(),
            is_external: true,
            display_name: DISPLAY_NAME.to_string(),
            order: self.config.storage_order,
        })
    }

    async fn is_available(&self) -> bool {
        self.client().await.is_ok()
    }

    async fn list(&self, args: ListArgs) -> ConnectorResult<ListResponse> {
        self.list_children(args).await
    }

    async fn get_metadata(&self, args: FileArgs) -> ConnectorResult<Option<GenericFileItem>> {
        self.ensure_type(&args.storage_type)?;
        self.lookup(&args.id).await
    }

    async fn fetch_content(&self, args: FileArgs) -> ConnectorResult<FileContent> {
        self.download(args).await
    }

    async fn fetch_thumbnail(&self, args: FileArgs) -> ConnectorResult<FileContent> {
        self.thumbnail(args).await
    }

    async fn create_folder(&self, args: CreateFolderArgs) -> ConnectorResult<GenericFileItem> {
        self.make_folder(args).await
    }

    async fn upload(&self, args: UploadArgs) -> ConnectorResult<GenericFileItem> {
        self.upload_file(args).await
    }

    async fn delete(&self, args: DeleteArgs) -> ConnectorResult<BatchOutcome> {
        self.delete_items(args).await
    }

    async fn rename(&self, args: RenameArgs) -> ConnectorResult<GenericFileItem> {
        self.rename_item(args).await
    }

    async fn move_items(&self, args: TransferArgs) -> ConnectorResult<BatchOutcome> {
        self.transfer(args, mutations::Transfer::Move).await
    }

    async fn copy_items(&self, args: TransferArgs) -> ConnectorResult<BatchOutcome> {
        self.transfer(args, mutations::Transfer::Copy).await
    }

    async fn resolve_link(&self, args: LinkArgs) -> ConnectorResult<Option<GenericFileItem>> {
        self.resolve_shared_link(&args.link).await
    }

    async fn get_quota(&self, args: QuotaArgs) -> ConnectorResult<Quota> {
        self.ensure_type(&args.storage_type)?;
        Ok(Quota::unlimited())
    }

    async fn check_quota(&self, args: QuotaArgs, _size: u64) -> ConnectorResult<bool> {
        self.ensure_type(&args.storage_type)?;
        Ok(true)
    }
}
