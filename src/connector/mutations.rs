//! Folder creation, upload, delete, rename, move and copy.
//!
//! Batch operations attempt every item and report per-item outcomes. A
//! failed item never aborts the rest of the batch.

use super::{folder_id, DriveConnector};
use crate::config::DeleteMode;
use crate::errors::{ConnectorResult, GoogleDriveError, UnavailableReason, UploadError};
use crate::mapping::{map_item, GenericFileItem, STORAGE_TYPE};
use crate::provider::{
    BatchOutcome, CreateFolderArgs, DeleteArgs, ItemOutcome, RenameArgs, TransferArgs,
    UploadArgs, UserRole,
};
use crate::services::FilesService;
use crate::types::{CopyFileRequest, CreateFileRequest, CreateFolderRequest, DriveFile};
use tracing::{info, warn};

/// Kind of transfer between folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transfer {
    Move,
    Copy,
}

/// Parents to drop so that `dest` becomes the only parent.
pub(crate) fn parents_to_remove<'a>(parents: &'a [String], dest: &str) -> Vec<&'a str> {
    parents
        .iter()
        .map(String::as_str)
        .filter(|parent| *parent != dest)
        .collect()
}

/// Content type of an upload, guessed from the file name.
pub(crate) fn upload_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

impl DriveConnector {
    fn map_created(&self, file: &DriveFile) -> ConnectorResult<GenericFileItem> {
        map_item(file, &self.mapping_context())
            .map_err(|e| GoogleDriveError::deserialization(e.to_string()).into())
    }

    pub(super) async fn make_folder(&self, args: CreateFolderArgs) -> ConnectorResult<GenericFileItem> {
        self.user.require_role(UserRole::NormalUser)?;
        self.ensure_type(&args.storage_type)?;
        let client = self.client().await?;

        let parent = folder_id(&args.path);
        let request = CreateFolderRequest::new(args.folder_name.as_str(), Some(parent.clone()));
        let folder = self.remote(client.files().create_folder(&request)).await?;

        info!(folder_id = %folder.id, parent = %parent, "Created folder");
        self.map_created(&folder)
    }

    pub(super) async fn upload_file(&self, args: UploadArgs) -> ConnectorResult<GenericFileItem> {
        self.user.require_role(UserRole::NormalUser)?;
        self.ensure_type(&args.storage_type)?;
        let client = self.client().await?;

        let content_type = upload_content_type(&args.name);
        let content = args.data.into_bytes().await.map_err(|e| {
            GoogleDriveError::Upload(UploadError::PayloadUnreadable(e.to_string()))
        })?;

        let metadata = CreateFileRequest {
            name: args.name,
            mime_type: Some(content_type.clone()),
            parents: Some(vec![folder_id(&args.path)]),
        };
        let file = self
            .remote(client.uploads().multipart_upload(&metadata, content, &content_type))
            .await?;

        self.map_created(&file)
    }

    pub(super) async fn delete_items(&self, args: DeleteArgs) -> ConnectorResult<BatchOutcome> {
        self.user.require_role(UserRole::NormalUser)?;
        self.ensure_type(&args.storage_type)?;
        let client = self.client().await?;
        let files = client.files();

        let mut outcome = BatchOutcome::new();
        for item in &args.items {
            let result = match self.config.delete_mode {
                DeleteMode::Trash => self.remote(files.trash(&item.name)).await.map(|_| ()),
                DeleteMode::Permanent => self.remote(files.delete(&item.name)).await,
            };
            outcome.push(self.record(&item.name, "delete", result));
        }
        Ok(outcome)
    }

    pub(super) async fn rename_item(&self, args: RenameArgs) -> ConnectorResult<GenericFileItem> {
        self.user.require_role(UserRole::NormalUser)?;
        self.ensure_type(&args.storage_type)?;
        let client = self.client().await?;

        let file = self
            .remote(client.files().rename(&args.name, &args.new_name))
            .await?;

        info!(file_id = %file.id, "Renamed item");
        self.map_created(&file)
    }

    pub(super) async fn transfer(
        &self,
        args: TransferArgs,
        kind: Transfer,
    ) -> ConnectorResult<BatchOutcome> {
        self.user.require_role(UserRole::NormalUser)?;
        self.ensure_type(&args.from_type)?;
        if let Some(to_type) = args.to_type.as_deref().filter(|t| *t != STORAGE_TYPE) {
            return Err(UnavailableReason::UnsupportedType(to_type.to_string()).into());
        }
        let client = self.client().await?;
        let files = client.files();

        let dest = folder_id(&args.to_path);
        let mut outcome = BatchOutcome::new();
        for item in &args.files {
            let result = match kind {
                Transfer::Move => self.move_one(&files, &item.name, &dest).await,
                Transfer::Copy => {
                    let request = CopyFileRequest {
                        name: None,
                        parents: Some(vec![dest.clone()]),
                    };
                    self.remote(files.copy(&item.name, &request)).await.map(|_| ())
                }
            };
            let operation = match kind {
                Transfer::Move => "move",
                Transfer::Copy => "copy",
            };
            outcome.push(self.record(&item.name, operation, result));
        }
        Ok(outcome)
    }

    async fn move_one(
        &self,
        files: &FilesService,
        file_id: &str,
        dest: &str,
    ) -> ConnectorResult<()> {
        let file = self.remote(files.get(file_id)).await?;
        let remove = parents_to_remove(&file.parents, dest);
        self.remote(files.move_file(file_id, &[dest], &remove))
            .await
            .map(|_| ())
    }

    fn record(&self, id: &str, operation: &str, result: ConnectorResult<()>) -> ItemOutcome {
        match result {
            Ok(()) => {
                info!(file_id = id, operation, "Item updated");
                ItemOutcome::succeeded(id)
            }
            Err(error) => {
                warn!(file_id = id, operation, error = %error, "Item failed");
                ItemOutcome::failed(id, error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parents_to_remove() {
        let parents = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(parents_to_remove(&parents, "B"), vec!["A", "C"]);
        assert_eq!(parents_to_remove(&parents, "D"), vec!["A", "B", "C"]);
        assert!(parents_to_remove(&[], "B").is_empty());
    }

    #[test]
    fn test_upload_content_type() {
        assert_eq!(upload_content_type("photo.png"), "image/png");
        assert_eq!(upload_content_type("notes.txt"), "text/plain");
        assert_eq!(upload_content_type("archive"), "application/octet-stream");
    }
}
