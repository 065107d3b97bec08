//! File content and thumbnail downloads.

use super::DriveConnector;
use crate::errors::{ConnectorResult, GoogleDriveError};
use crate::mapping::{content_source, display_name, resolve_shortcut, ContentSource};
use crate::provider::{FileArgs, FileContent};
use tracing::debug;

impl DriveConnector {
    /// Downloads a file, exporting native documents.
    pub(super) async fn download(&self, args: FileArgs) -> ConnectorResult<FileContent> {
        self.ensure_type(&args.storage_type)?;
        let client = self.client().await?;
        let files = client.files();

        let file = self.remote(files.get(&args.id)).await?;
        let name = display_name(&file);

        let (data, content_type) = match content_source(&file) {
            ContentSource::Media {
                file_id,
                content_type,
            } => (self.remote(files.download(&file_id)).await?, content_type),
            ContentSource::Export { file_id, target } => (
                self.remote(files.export(&file_id, target.mime_type)).await?,
                target.mime_type.to_string(),
            ),
            ContentSource::Unavailable(reason) => return Err(reason.into()),
        };

        debug!(file_id = %args.id, size = data.len(), "Downloaded file content");
        Ok(FileContent::new(name, content_type, data))
    }

    /// Fetches a file's thumbnail through an authenticated request.
    pub(super) async fn thumbnail(&self, args: FileArgs) -> ConnectorResult<FileContent> {
        self.ensure_type(&args.storage_type)?;
        let client = self.client().await?;
        let files = client.files();

        let mut file = self.remote(files.get(&args.id)).await?;
        let target = resolve_shortcut(&file);
        if target.id != file.id {
            // Drive leaves thumbnailLink empty on the shortcut itself.
            file = self.remote(files.get(&target.id)).await?;
        }
        let link = file
            .thumbnail_link
            .as_deref()
            .filter(|link| !link.is_empty())
            .ok_or_else(|| GoogleDriveError::not_found(format!("{} has no thumbnail", args.id)))?;

        let (data, content_type) = self.remote(files.thumbnail(link)).await?;
        let content_type =
            content_type.unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.essence_str().to_string());

        Ok(FileContent::new(display_name(&file), content_type, data))
    }
}
