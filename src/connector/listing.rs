//! Folder listing, breadcrumbs and single-item lookup.

use super::{folder_id, DriveConnector, ROOT_FOLDER};
use crate::client::GoogleDriveClient;
use crate::errors::ConnectorResult;
use crate::mapping::{map_item, GenericFileItem, MappingContext};
use crate::provider::{ListArgs, ListResponse};
use crate::types::{DriveFile, ListFilesParams};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Escapes a value for a single-quoted Drive query literal.
pub(crate) fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Query for the non-trashed children of `folder`, optionally filtered by
/// name.
pub(crate) fn children_query(folder: &str, pattern: Option<&str>) -> String {
    let mut query = format!("'{}' in parents and trashed = false", escape_query(folder));
    if let Some(pattern) = pattern.filter(|p| !p.is_empty()) {
        query.push_str(&format!(" and name contains '{}'", escape_query(pattern)));
    }
    query
}

fn map_children(files: &[DriveFile], ctx: &MappingContext) -> Vec<GenericFileItem> {
    files
        .iter()
        .filter_map(|file| match map_item(file, ctx) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!(file_id = %file.id, error = %e, "Skipping unmappable child");
                None
            }
        })
        .collect()
}

impl DriveConnector {
    pub(super) async fn list_children(&self, args: ListArgs) -> ConnectorResult<ListResponse> {
        self.ensure_type(&args.storage_type)?;
        let client = self.client().await?;

        let folder = folder_id(&args.path);
        let params = ListFilesParams {
            q: Some(children_query(&folder, args.pattern.as_deref())),
            order_by: self.config.order_by.clone(),
            page_size: self.config.page_size,
            ..Default::default()
        };

        let collected = client.files().list_all_lenient(params).await;
        let truncated = collected.is_truncated();
        if let Some(error) = collected.error {
            warn!(
                folder = %folder,
                pages = collected.pages_fetched,
                error = %error,
                "Listing stopped at a failed page"
            );
            if error.is_unauthorized() {
                self.invalidate_client().await;
            }
        }

        let ctx = self.mapping_context();
        let items = map_children(&collected.items, &ctx);

        let path = if args.path_required {
            Some(self.breadcrumb(&client, &folder, &ctx).await)
        } else {
            None
        };

        debug!(folder = %folder, count = items.len(), truncated, "Listed folder");
        Ok(ListResponse {
            items,
            path,
            truncated,
        })
    }

    /// Current folder first, then its ancestors up to, not including, the
    /// root.
    async fn breadcrumb(
        &self,
        client: &GoogleDriveClient,
        folder: &str,
        ctx: &MappingContext,
    ) -> Vec<GenericFileItem> {
        let mut path = Vec::new();
        if folder == ROOT_FOLDER {
            return path;
        }

        let files = client.files();
        let root_id = match files.root_id().await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(error = %e, "Could not resolve root folder id");
                None
            }
        };
        let is_root = |id: &str| id == ROOT_FOLDER || root_id.as_deref() == Some(id);

        let mut visited = HashSet::new();
        let mut current = folder.to_string();
        while !is_root(&current) {
            if !visited.insert(current.clone()) {
                warn!(folder = %current, "Parent chain loops, stopping");
                break;
            }

            let file = match files.get(&current).await {
                Ok(file) => file,
                Err(e) => {
                    warn!(folder = %current, error = %e, "Breadcrumb walk stopped");
                    break;
                }
            };
            // Without a root id, the parentless folder at the top is the root.
            if root_id.is_none() && file.parents.is_empty() {
                break;
            }
            if let Ok(item) = map_item(&file, ctx) {
                path.push(item);
            }

            match file.parents.first() {
                Some(parent) => current = parent.clone(),
                None => break,
            }
        }
        path
    }

    /// Looks up one item. Not found is `Ok(None)`.
    pub(super) async fn lookup(&self, file_id: &str) -> ConnectorResult<Option<GenericFileItem>> {
        let client = self.client().await?;
        let file = match client.files().get(file_id).await {
            Ok(file) => file,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(self.remote_error(e).await),
        };

        match map_item(&file, &self.mapping_context()) {
            Ok(item) => Ok(Some(item)),
            Err(e) => {
                debug!(file_id, error = %e, "Item cannot be mapped");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::mime_types;

    #[test]
    fn test_children_query() {
        assert_eq!(
            children_query("root", None),
            "'root' in parents and trashed = false"
        );
        assert_eq!(
            children_query("abc", Some("report")),
            "'abc' in parents and trashed = false and name contains 'report'"
        );
        assert_eq!(
            children_query("abc", Some("")),
            "'abc' in parents and trashed = false"
        );
    }

    #[test]
    fn test_query_values_are_escaped() {
        assert_eq!(escape_query("it's"), "it\\'s");
        assert_eq!(escape_query("a\\b"), "a\\\\b");
        assert_eq!(
            children_query("root", Some("x' or '1'='1")),
            "'root' in parents and trashed = false and name contains 'x\\' or \\'1\\'=\\'1'"
        );
    }

    #[test]
    fn test_unmappable_children_are_dropped() {
        let files = vec![
            DriveFile {
                id: "a".to_string(),
                name: "a".to_string(),
                mime_type: "text/plain".to_string(),
                ..Default::default()
            },
            DriveFile {
                id: String::new(),
                name: "broken".to_string(),
                mime_type: mime_types::FOLDER.to_string(),
                ..Default::default()
            },
        ];
        let items = map_children(&files, &MappingContext::new(1));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "a");
    }
}
