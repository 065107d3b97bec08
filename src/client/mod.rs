//! Drive v3 client: one executor shared by the file and upload services.

use crate::auth::AuthProvider;
use crate::config::GoogleDriveConfig;
use crate::errors::{GoogleDriveError, GoogleDriveResult};
use crate::services::{FilesService, UploadService};
use crate::transport::{HttpTransport, ReqwestTransport};
use std::sync::Arc;

mod executor;
pub use executor::{path_segment, QueryParams, RequestExecutor};

/// Authenticated Drive client for one user.
pub struct GoogleDriveClient {
    config: GoogleDriveConfig,
    executor: Arc<RequestExecutor>,
}

impl GoogleDriveClient {
    /// Creates a client with a reqwest transport built from `config`.
    pub fn new(config: GoogleDriveConfig, auth: Arc<dyn AuthProvider>) -> GoogleDriveResult<Self> {
        let transport = ReqwestTransport::from_config(&config).map_err(|e| {
            GoogleDriveError::configuration(format!("Failed to create transport: {}", e))
        })?;
        Self::with_transport(config, Arc::new(transport), auth)
    }

    /// Creates a client over an existing transport.
    pub fn with_transport(
        config: GoogleDriveConfig,
        transport: Arc<dyn HttpTransport>,
        auth: Arc<dyn AuthProvider>,
    ) -> GoogleDriveResult<Self> {
        config.validate()?;

        let executor = Arc::new(RequestExecutor::new(config.clone(), transport, auth));
        Ok(Self { config, executor })
    }

    /// File metadata, listing, content and mutations.
    pub fn files(&self) -> FilesService {
        FilesService::new(self.executor.clone())
    }

    /// Multipart uploads.
    pub fn uploads(&self) -> UploadService {
        UploadService::new(self.executor.clone())
    }

    /// Configuration the client was built with.
    pub fn config(&self) -> &GoogleDriveConfig {
        &self.config
    }
}

impl std::fmt::Debug for GoogleDriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDriveClient")
            .field("base_url", &self.config.base_url.as_str())
            .finish_non_exhaustive()
    }
}
