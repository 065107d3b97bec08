//! Host-facing storage provider abstraction.
//!
//! The host dispatches each file-manager operation to the provider registered
//! for the request's storage type. Providers answer with typed results or
//! with [`ConnectorError::Unavailable`] when the request is not theirs to
//! serve.

mod requests;

pub use requests::{
    CreateFolderArgs, DeleteArgs, FileArgs, HostArgs, ItemRef, LinkArgs, ListArgs, QuotaArgs,
    RenameArgs, TransferArgs, UploadArgs, UploadPayload,
};

use crate::errors::{ConnectorError, ConnectorResult, UnavailableReason};
use crate::mapping::GenericFileItem;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

/// Role of the authenticated host user, in ascending order of privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UserRole {
    /// Not logged in.
    Anonymous,
    /// Regular user.
    NormalUser,
    /// Administrator of one tenant.
    TenantAdmin,
    /// Administrator of the whole installation.
    SuperAdmin,
}

/// The host user a provider acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserContext {
    /// Host user id.
    pub user_id: i64,
    /// Role.
    pub role: UserRole,
}

impl UserContext {
    /// Creates a user context.
    pub fn new(user_id: i64, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// A regular logged-in user.
    pub fn normal_user(user_id: i64) -> Self {
        Self::new(user_id, UserRole::NormalUser)
    }

    /// Fails with `AccessDenied` unless the user has at least `role`.
    pub fn require_role(&self, role: UserRole) -> ConnectorResult<()> {
        if self.role >= role {
            Ok(())
        } else {
            Err(ConnectorError::AccessDenied(format!(
                "{:?} required, user {} is {:?}",
                role, self.user_id, self.role
            )))
        }
    }
}

/// Entry in the host's list of storages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageDescriptor {
    /// Storage type.
    #[serde(rename = "Type")]
    pub storage_type: String,
    /// Whether the storage lives outside the host.
    pub is_external: bool,
    /// Label shown to the user.
    pub display_name: String,
    /// Sort position among storages.
    pub order: i32,
}

/// Children of a folder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListResponse {
    /// Mapped children.
    pub items: Vec<GenericFileItem>,
    /// Breadcrumb, current folder first, when requested.
    pub path: Option<Vec<GenericFileItem>>,
    /// Set when a page fetch failed and `items` is incomplete.
    pub truncated: bool,
}

/// Downloaded file content.
#[derive(Debug, Clone)]
pub struct FileContent {
    /// Display name, with the export extension for native documents.
    pub name: String,
    /// Content type of `data`.
    pub content_type: String,
    /// Buffered body.
    pub data: Cursor<Bytes>,
}

impl FileContent {
    /// Wraps a buffered body.
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: Cursor::new(data),
        }
    }

    /// Length of the body in bytes.
    pub fn len(&self) -> usize {
        self.data.get_ref().len()
    }

    /// Returns true if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.data.get_ref().is_empty()
    }
}

/// Quota usage in bytes. A zero limit means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// Bytes used.
    pub used: u64,
    /// Byte limit.
    pub limit: u64,
}

impl Quota {
    /// No limit.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Returns true if no limit applies.
    pub fn is_unlimited(&self) -> bool {
        self.limit == 0
    }

    /// `[used, limit]`, as the host reports quota.
    pub fn as_pair(&self) -> [u64; 2] {
        [self.used, self.limit]
    }
}

/// Result of one item in a batch mutation.
#[derive(Debug)]
pub struct ItemOutcome {
    /// Drive id of the item.
    pub id: String,
    /// `None` on success.
    pub error: Option<ConnectorError>,
}

impl ItemOutcome {
    /// A successful item.
    pub fn succeeded(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            error: None,
        }
    }

    /// A failed item.
    pub fn failed(id: impl Into<String>, error: ConnectorError) -> Self {
        Self {
            id: id.into(),
            error: Some(error),
        }
    }

    /// Returns true on success.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-item results of a batch mutation, in request order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Outcomes.
    pub items: Vec<ItemOutcome>,
}

impl BatchOutcome {
    /// Creates an empty outcome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an item.
    pub fn push(&mut self, outcome: ItemOutcome) {
        self.items.push(outcome);
    }

    /// Legacy single flag: the outcome of the last attempted item.
    ///
    /// False when nothing was attempted.
    pub fn success(&self) -> bool {
        self.items.last().map(ItemOutcome::is_success).unwrap_or(false)
    }

    /// Returns true if at least one item was attempted and none failed.
    pub fn all_succeeded(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(ItemOutcome::is_success)
    }

    /// Failed items.
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|outcome| !outcome.is_success())
    }
}

/// One external storage backend.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Storage type served, e.g. `"google"`.
    fn storage_type(&self) -> &str;

    /// The storage list entry, or `None` when the storage is not offered to
    /// this user.
    async fn storage_descriptor(&self) -> Option<StorageDescriptor>;

    /// Returns true if a live client can be built for the user.
    async fn is_available(&self) -> bool;

    /// Lists a folder.
    async fn list(&self, args: ListArgs) -> ConnectorResult<ListResponse>;

    /// Looks up one item. `Ok(None)` when it does not exist.
    async fn get_metadata(&self, args: FileArgs) -> ConnectorResult<Option<GenericFileItem>>;

    /// Downloads an item's content.
    async fn fetch_content(&self, args: FileArgs) -> ConnectorResult<FileContent>;

    /// Downloads an item's thumbnail.
    async fn fetch_thumbnail(&self, args: FileArgs) -> ConnectorResult<FileContent>;

    /// Creates a folder.
    async fn create_folder(&self, args: CreateFolderArgs) -> ConnectorResult<GenericFileItem>;

    /// Uploads a file.
    async fn upload(&self, args: UploadArgs) -> ConnectorResult<GenericFileItem>;

    /// Deletes items.
    async fn delete(&self, args: DeleteArgs) -> ConnectorResult<BatchOutcome>;

    /// Renames an item.
    async fn rename(&self, args: RenameArgs) -> ConnectorResult<GenericFileItem>;

    /// Moves items into another folder.
    async fn move_items(&self, args: TransferArgs) -> ConnectorResult<BatchOutcome>;

    /// Copies items into another folder.
    async fn copy_items(&self, args: TransferArgs) -> ConnectorResult<BatchOutcome>;

    /// Resolves a shared link to the item it points at.
    async fn resolve_link(&self, args: LinkArgs) -> ConnectorResult<Option<GenericFileItem>>;

    /// Reports quota usage.
    async fn get_quota(&self, args: QuotaArgs) -> ConnectorResult<Quota>;

    /// Returns true if `size` more bytes fit.
    async fn check_quota(&self, args: QuotaArgs, size: u64) -> ConnectorResult<bool>;
}

/// Storage providers by storage type.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn StorageProvider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` under its storage type, replacing any previous one.
    pub fn register(&mut self, provider: Arc<dyn StorageProvider>) {
        self.providers
            .insert(provider.storage_type().to_string(), provider);
    }

    /// Provider for `storage_type`.
    pub fn get(&self, storage_type: &str) -> ConnectorResult<Arc<dyn StorageProvider>> {
        self.providers
            .get(storage_type)
            .cloned()
            .ok_or_else(|| UnavailableReason::UnsupportedType(storage_type.to_string()).into())
    }

    /// Registered storage types.
    pub fn storage_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Storage list entries of every offered provider, sorted by order.
    pub async fn storages(&self) -> Vec<StorageDescriptor> {
        let mut storages = Vec::new();
        for provider in self.providers.values() {
            if let Some(descriptor) = provider.storage_descriptor().await {
                storages.push(descriptor);
            }
        }
        storages.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.storage_type.cmp(&b.storage_type))
        });
        storages
    }

    /// Dispatches a listing to the provider for its storage type.
    pub async fn list(&self, args: ListArgs) -> ConnectorResult<ListResponse> {
        self.get(&args.storage_type)?.list(args).await
    }

    /// Dispatches a metadata lookup.
    pub async fn get_metadata(&self, args: FileArgs) -> ConnectorResult<Option<GenericFileItem>> {
        self.get(&args.storage_type)?.get_metadata(args).await
    }

    /// Dispatches a content download.
    pub async fn fetch_content(&self, args: FileArgs) -> ConnectorResult<FileContent> {
        self.get(&args.storage_type)?.fetch_content(args).await
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("storage_types", &self.storage_types())
            .finish()
    }
}
