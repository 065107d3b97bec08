//! Multipart upload for Google Drive.
//!
//! The metadata and the whole payload go out in one `multipart/related`
//! request to `upload/drive/v3/files?uploadType=multipart`.

use crate::client::RequestExecutor;
use crate::errors::{GoogleDriveError, GoogleDriveResult, RequestError, UploadError};
use crate::transport::{HttpMethod, MultipartBody, RequestBody};
use crate::types::{CreateFileRequest, DriveFile, FILE_FIELDS};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};

/// Service for uploading file content.
pub struct UploadService {
    executor: Arc<RequestExecutor>,
}

impl UploadService {
    /// Creates a new upload service.
    pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Creates a file with metadata and content in one request.
    pub async fn multipart_upload(
        &self,
        metadata: &CreateFileRequest,
        content: Bytes,
        mime_type: &str,
    ) -> GoogleDriveResult<DriveFile> {
        if metadata.name.is_empty() {
            return Err(GoogleDriveError::missing_parameter("name is required"));
        }

        if let Some(max) = self.executor.config().max_upload_size {
            if content.len() as u64 > max {
                return Err(GoogleDriveError::Upload(UploadError::UploadSizeExceeded(
                    format!("{} bytes exceeds the {} byte limit", content.len(), max),
                )));
            }
        }

        let metadata_bytes = serde_json::to_vec(metadata).map(Bytes::from).map_err(|e| {
            GoogleDriveError::Request(RequestError::ValidationError(format!(
                "Failed to serialize metadata: {}",
                e
            )))
        })?;

        debug!(name = %metadata.name, size = content.len(), mime_type, "Starting multipart upload");

        let size = content.len();
        let body = RequestBody::Multipart(MultipartBody::new(metadata_bytes, content, mime_type));

        let file: DriveFile = self
            .executor
            .execute_upload(
                HttpMethod::Post,
                "files",
                &[
                    ("uploadType", "multipart".to_string()),
                    ("fields", FILE_FIELDS.to_string()),
                ],
                body,
            )
            .await
            .map_err(|e| match e {
                GoogleDriveError::Network(inner) => {
                    GoogleDriveError::Upload(UploadError::UploadFailed(inner.to_string()))
                }
                other => other,
            })?;

        info!(file_id = %file.id, size, "Uploaded file");
        Ok(file)
    }
}
