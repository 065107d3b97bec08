//! Type definitions for the Google Drive API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Well-known MIME types.
pub mod mime_types {
    /// Folder sentinel.
    pub const FOLDER: &str = "application/vnd.google-apps.folder";
    /// Shortcut.
    pub const SHORTCUT: &str = "application/vnd.google-apps.shortcut";
    /// Google Docs document.
    pub const DOCUMENT: &str = "application/vnd.google-apps.document";
    /// Google Sheets spreadsheet.
    pub const SPREADSHEET: &str = "application/vnd.google-apps.spreadsheet";
    /// Google Slides presentation.
    pub const PRESENTATION: &str = "application/vnd.google-apps.presentation";
    /// Google Drawings drawing.
    pub const DRAWING: &str = "application/vnd.google-apps.drawing";
    /// Prefix shared by every native Google document type.
    pub const NATIVE_PREFIX: &str = "application/vnd.google-apps.";

    /// Word document.
    pub const DOCX: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
    /// Excel workbook.
    pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
    /// PowerPoint presentation.
    pub const PPTX: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation";
    /// PNG image.
    pub const PNG: &str = "image/png";
    /// Fallback for unknown content.
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Fields requested for a single file.
pub const FILE_FIELDS: &str = "id,name,mimeType,size,parents,createdTime,modifiedTime,\
hasThumbnail,thumbnailLink,iconLink,webViewLink,exportLinks,shortcutDetails,trashed";

/// Fields requested for a listing page.
pub const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,size,parents,createdTime,\
modifiedTime,hasThumbnail,thumbnailLink,iconLink,webViewLink,exportLinks,shortcutDetails,trashed)";

/// Google Drive file representation.
///
/// Every field is optional on the wire; listing code decides what is
/// required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID.
    #[serde(default)]
    pub id: String,

    /// File name.
    #[serde(default)]
    pub name: String,

    /// MIME type.
    #[serde(default)]
    pub mime_type: String,

    /// Size in bytes, sent as a decimal string. Absent for folders and
    /// native documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Parent folder IDs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,

    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,

    /// Last modification time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,

    /// Whether the file has a thumbnail.
    #[serde(default)]
    pub has_thumbnail: bool,

    /// Short-lived thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_link: Option<String>,

    /// Icon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_link: Option<String>,

    /// Link to view in Drive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,

    /// Export URLs keyed by MIME type (native documents only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_links: Option<HashMap<String, String>>,

    /// Shortcut target (shortcuts only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut_details: Option<ShortcutDetails>,

    /// Whether the file is in trash.
    #[serde(default)]
    pub trashed: bool,
}

impl DriveFile {
    /// Returns true for folders.
    pub fn is_folder(&self) -> bool {
        self.mime_type == mime_types::FOLDER
    }

    /// Returns true for shortcuts.
    pub fn is_shortcut(&self) -> bool {
        self.mime_type == mime_types::SHORTCUT
    }

    /// Size in bytes, zero when unknown.
    pub fn size_bytes(&self) -> u64 {
        self.size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }
}

/// A page of files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    /// Token for the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,

    /// Files on this page.
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

/// Shortcut details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutDetails {
    /// Target ID.
    #[serde(default)]
    pub target_id: String,

    /// Target MIME type.
    #[serde(default)]
    pub target_mime_type: String,
}

// ============================================================================
// Request Types
// ============================================================================

/// Metadata of a file created by upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileRequest {
    /// File name.
    pub name: String,

    /// MIME type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Parent folder IDs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
}

/// Request to update file metadata.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileRequest {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Whether trashed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trashed: Option<bool>,
}

/// Request to copy a file.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyFileRequest {
    /// New file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Destination parent folder IDs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
}

/// Request to create a folder.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    /// Folder name.
    pub name: String,

    /// Always the folder sentinel.
    pub mime_type: &'static str,

    /// Parent folder IDs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
}

impl CreateFolderRequest {
    /// Creates a folder request under `parent`.
    pub fn new(name: impl Into<String>, parent: Option<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_types::FOLDER,
            parents: parent.map(|p| vec![p]),
        }
    }
}

/// Parameters for listing files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListFilesParams {
    /// Query string.
    pub q: Option<String>,

    /// Order by clause.
    pub order_by: Option<String>,

    /// Page size.
    pub page_size: Option<u32>,

    /// Page token.
    pub page_token: Option<String>,

    /// Fields to return.
    pub fields: Option<String>,
}

impl ListFilesParams {
    /// Converts to query parameters.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(q) = &self.q {
            query.push(("q", q.clone()));
        }
        if let Some(order_by) = &self.order_by {
            query.push(("orderBy", order_by.clone()));
        }
        if let Some(page_size) = self.page_size {
            query.push(("pageSize", page_size.to_string()));
        }
        if let Some(page_token) = &self.page_token {
            query.push(("pageToken", page_token.clone()));
        }
        query.push((
            "fields",
            self.fields.clone().unwrap_or_else(|| LIST_FIELDS.to_string()),
        ));
        query
    }
}
