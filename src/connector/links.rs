//! Shared-link resolution and decoration of host link items.

use super::DriveConnector;
use crate::errors::{ConnectorResult, UnavailableReason};
use crate::links::{apply_link_info, extract_drive_id, is_drive_link};
use crate::mapping::{display_name, GenericFileItem};
use crate::types::DriveFile;
use tracing::debug;

impl DriveConnector {
    /// Resolves a Drive shared link to the item it points at.
    pub(super) async fn resolve_shared_link(
        &self,
        link: &str,
    ) -> ConnectorResult<Option<GenericFileItem>> {
        let id = extract_drive_id(link)
            .ok_or_else(|| UnavailableReason::MalformedLink(link.to_string()))?;
        self.lookup(&id).await
    }

    /// Decorates a host item that links to Drive.
    ///
    /// Returns false for items that are not Drive links. Remote failures only
    /// leave the item undecorated.
    pub async fn populate_link_item(&self, item: &mut GenericFileItem) -> bool {
        let is_drive = item.is_link && item.link_url.as_deref().map(is_drive_link).unwrap_or(false);
        if !is_drive {
            return false;
        }

        let info = match item.link_url.as_deref() {
            Some(link) => self.link_info(link).await,
            None => None,
        };
        apply_link_info(item, info.as_ref(), &self.config.folder_icon_url)
    }

    async fn link_info(&self, link: &str) -> Option<DriveFile> {
        let id = extract_drive_id(link)?;
        let client = match self.client().await {
            Ok(client) => client,
            Err(e) => {
                debug!(error = %e, "No Drive client for link item");
                return None;
            }
        };
        match client.files().get(&id).await {
            Ok(mut file) => {
                file.name = display_name(&file);
                Some(file)
            }
            Err(e) => {
                debug!(file_id = %id, error = %e, "Link target lookup failed");
                None
            }
        }
    }
}
