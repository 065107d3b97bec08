//! Google Drive External Storage
//!
//! Exposes a user's Google Drive as a `"google"` storage inside a host file
//! manager. The host dispatches file-manager operations through the
//! [`StorageProvider`] trait; [`DriveConnector`] answers them with Drive v3
//! REST calls and maps Drive files to the host's [`GenericFileItem`].
//!
//! # Features
//!
//! - **Credentials**: access tokens from the host's OAuth account store,
//!   refreshed on expiry or rejection and written back to the store
//! - **Listing**: lenient pagination, name filtering, breadcrumbs
//! - **Content**: media downloads, exports of native Google documents,
//!   authenticated thumbnails
//! - **Mutations**: folder creation, multipart upload, trash or delete,
//!   rename, move, copy, with per-item outcomes
//! - **Links**: shared-link resolution and `.url` shortcut files
//!
//! # Example
//!
//! ```no_run
//! use integrations_google_drive_storage::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let accounts = Arc::new(InMemoryAccountStore::new());
//! accounts
//!     .insert(OAuthAccount::new(7, "", "refresh-token").with_scopes("auth storage"))
//!     .await;
//!
//! let connector = DriveConnector::new(
//!     GoogleDriveConfig::default(),
//!     ProviderSettings::new("client-id", "client-secret"),
//!     ModuleSettings::with_storage(),
//!     UserContext::normal_user(7),
//!     accounts,
//! )?;
//!
//! let listing = connector.list(ListArgs::new("google", "")).await?;
//! for item in listing.items {
//!     println!("{} {}", item.id, item.name);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod client;
pub mod config;
pub mod connector;
pub mod errors;
pub mod links;
pub mod logging;
pub mod mapping;
pub mod pagination;
pub mod provider;
pub mod services;
pub mod settings;
pub mod transport;
pub mod types;

pub use auth::{AccessToken, AccountTokenProvider, AuthProvider, OAuthAccount, OAuthAccountStore};
pub use client::GoogleDriveClient;
pub use config::{GoogleDriveConfig, GoogleDriveConfigBuilder};
pub use connector::DriveConnector;
pub use errors::{ConnectorError, ConnectorResult, GoogleDriveError, GoogleDriveResult, UnavailableReason};
pub use mapping::GenericFileItem;
pub use provider::{ProviderRegistry, StorageProvider};
pub use types::DriveFile;

/// Commonly used types and traits.
///
/// ```no_run
/// use integrations_google_drive_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::auth::{InMemoryAccountStore, OAuthAccount, OAuthAccountStore};
    pub use crate::config::{
        DeleteMode, GoogleDriveConfig, GoogleDriveConfigBuilder, LastModifiedSource,
        ThumbnailMode,
    };
    pub use crate::connector::DriveConnector;
    pub use crate::errors::{ConnectorError, ConnectorResult, UnavailableReason};
    pub use crate::links::HostFileReader;
    pub use crate::mapping::{FileAction, GenericFileItem, ItemHash};
    pub use crate::provider::{
        BatchOutcome, CreateFolderArgs, DeleteArgs, FileArgs, FileContent, HostArgs, ItemRef,
        LinkArgs, ListArgs, ListResponse, ProviderRegistry, Quota, QuotaArgs, RenameArgs,
        StorageDescriptor, StorageProvider, TransferArgs, UploadArgs, UploadPayload, UserContext,
        UserRole,
    };
    pub use crate::settings::{ModuleSettings, ProviderSettings};
}
