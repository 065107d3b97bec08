//! Files service for Google Drive API.
//!
//! Covers the `files` resource calls the storage connector needs: metadata
//! reads, listing, folder creation, metadata updates (rename, trash, move),
//! permanent deletion, copying, and content retrieval through `alt=media`
//! or `export`.

use crate::client::{path_segment, RequestExecutor};
use crate::errors::{GoogleDriveError, GoogleDriveResult, RequestError};
use crate::pagination::{Page, PageIterator, PartialCollection};
use crate::transport::{HttpMethod, RequestBody};
use crate::types::*;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Service for file operations.
pub struct FilesService {
    executor: Arc<RequestExecutor>,
}

impl FilesService {
    /// Creates a new files service.
    pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Gets file metadata.
    pub async fn get(&self, file_id: &str) -> GoogleDriveResult<DriveFile> {
        require_id(file_id)?;
        self.executor
            .execute_request(
                HttpMethod::Get,
                &file_path(file_id),
                &[("fields", FILE_FIELDS.to_string())],
                RequestBody::Empty,
            )
            .await
    }

    /// Resolves the id of the user's root folder.
    pub async fn root_id(&self) -> GoogleDriveResult<String> {
        let root: DriveFile = self
            .executor
            .execute_request(
                HttpMethod::Get,
                "files/root",
                &[("fields", "id".to_string())],
                RequestBody::Empty,
            )
            .await?;
        if root.id.is_empty() {
            return Err(GoogleDriveError::deserialization("root folder has no id"));
        }
        Ok(root.id)
    }

    /// Lists one page of files.
    pub async fn list(&self, params: &ListFilesParams) -> GoogleDriveResult<FileList> {
        debug!(q = ?params.q, page_token = ?params.page_token, "Listing files");
        self.executor
            .execute_request(
                HttpMethod::Get,
                "files",
                &params.to_query(),
                RequestBody::Empty,
            )
            .await
    }

    /// Lists every page of files, keeping the pages fetched before a failure.
    pub async fn list_all_lenient(
        &self,
        params: ListFilesParams,
    ) -> PartialCollection<DriveFile> {
        let mut pages = PageIterator::new(|page_token: Option<String>| {
            let params = ListFilesParams {
                page_token,
                ..params.clone()
            };
            async move {
                let list = self.list(&params).await?;
                Ok::<_, GoogleDriveError>(Page::new(list.files, list.next_page_token))
            }
        });
        pages.collect_until_error().await
    }

    /// Creates a folder.
    pub async fn create_folder(&self, request: &CreateFolderRequest) -> GoogleDriveResult<DriveFile> {
        if request.name.is_empty() {
            return Err(GoogleDriveError::missing_parameter("name is required"));
        }
        self.executor
            .execute_request(
                HttpMethod::Post,
                "files",
                &[("fields", FILE_FIELDS.to_string())],
                json_body(request)?,
            )
            .await
    }

    /// Updates file metadata.
    pub async fn update(
        &self,
        file_id: &str,
        request: &UpdateFileRequest,
    ) -> GoogleDriveResult<DriveFile> {
        require_id(file_id)?;
        self.executor
            .execute_request(
                HttpMethod::Patch,
                &file_path(file_id),
                &[("fields", FILE_FIELDS.to_string())],
                json_body(request)?,
            )
            .await
    }

    /// Renames a file.
    pub async fn rename(&self, file_id: &str, name: &str) -> GoogleDriveResult<DriveFile> {
        if name.is_empty() {
            return Err(GoogleDriveError::missing_parameter("name is required"));
        }
        self.update(
            file_id,
            &UpdateFileRequest {
                name: Some(name.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Moves a file to the trash.
    pub async fn trash(&self, file_id: &str) -> GoogleDriveResult<DriveFile> {
        self.update(
            file_id,
            &UpdateFileRequest {
                trashed: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    /// Changes a file's parents in one PATCH.
    pub async fn move_file(
        &self,
        file_id: &str,
        add_parents: &[&str],
        remove_parents: &[&str],
    ) -> GoogleDriveResult<DriveFile> {
        require_id(file_id)?;

        let mut query = vec![("fields", FILE_FIELDS.to_string())];
        if !add_parents.is_empty() {
            query.push(("addParents", add_parents.join(",")));
        }
        if !remove_parents.is_empty() {
            query.push(("removeParents", remove_parents.join(",")));
        }

        self.executor
            .execute_request(
                HttpMethod::Patch,
                &file_path(file_id),
                &query,
                json_body(&UpdateFileRequest::default())?,
            )
            .await
    }

    /// Permanently deletes a file, skipping the trash.
    pub async fn delete(&self, file_id: &str) -> GoogleDriveResult<()> {
        require_id(file_id)?;
        // Drive answers 204 with an empty body.
        self.executor
            .execute_request_raw(
                HttpMethod::Delete,
                &file_path(file_id),
                &[],
                RequestBody::Empty,
            )
            .await?;
        Ok(())
    }

    /// Copies a file.
    pub async fn copy(
        &self,
        file_id: &str,
        request: &CopyFileRequest,
    ) -> GoogleDriveResult<DriveFile> {
        require_id(file_id)?;
        self.executor
            .execute_request(
                HttpMethod::Post,
                &format!("{}/copy", file_path(file_id)),
                &[("fields", FILE_FIELDS.to_string())],
                json_body(request)?,
            )
            .await
    }

    /// Downloads file content.
    pub async fn download(&self, file_id: &str) -> GoogleDriveResult<Bytes> {
        require_id(file_id)?;
        let response = self
            .executor
            .execute_request_raw(
                HttpMethod::Get,
                &file_path(file_id),
                &[("alt", "media".to_string())],
                RequestBody::Empty,
            )
            .await?;
        Ok(response.body)
    }

    /// Exports a native Google document to `mime_type`.
    pub async fn export(&self, file_id: &str, mime_type: &str) -> GoogleDriveResult<Bytes> {
        require_id(file_id)?;
        if mime_type.is_empty() {
            return Err(GoogleDriveError::missing_parameter("mime_type is required"));
        }
        let response = self
            .executor
            .execute_request_raw(
                HttpMethod::Get,
                &format!("{}/export", file_path(file_id)),
                &[("mimeType", mime_type.to_string())],
                RequestBody::Empty,
            )
            .await?;
        Ok(response.body)
    }

    /// Fetches a thumbnail through an authenticated GET of its link.
    pub async fn thumbnail(&self, link: &str) -> GoogleDriveResult<(Bytes, Option<String>)> {
        let url = Url::parse(link).map_err(|e| {
            GoogleDriveError::Request(RequestError::InvalidParameter(format!(
                "Invalid thumbnail link: {}",
                e
            )))
        })?;
        let response = self.executor.execute_absolute_raw(url).await?;
        let content_type = response.content_type().map(str::to_string);
        Ok((response.body, content_type))
    }
}

fn file_path(file_id: &str) -> String {
    format!("files/{}", path_segment(file_id))
}

fn require_id(file_id: &str) -> GoogleDriveResult<()> {
    if file_id.is_empty() {
        return Err(GoogleDriveError::missing_parameter("file_id is required"));
    }
    Ok(())
}

pub(crate) fn json_body<T: serde::Serialize>(value: &T) -> GoogleDriveResult<RequestBody> {
    RequestBody::json(value).map_err(|e| {
        GoogleDriveError::Request(RequestError::ValidationError(format!(
            "Failed to serialize request: {}",
            e
        )))
    })
}
