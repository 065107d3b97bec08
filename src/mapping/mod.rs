//! Translation of Drive files into the host's generic file items.
//!
//! Mapping is pure: shortcuts are resolved to their targets, native Google
//! documents get an export target, and action URLs carry an opaque
//! [`ItemHash`] the host decodes when the user opens or downloads a file.

use crate::config::{LastModifiedSource, ThumbnailMode};
use crate::errors::UnavailableReason;
use crate::types::{mime_types, DriveFile};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage type this connector serves.
pub const STORAGE_TYPE: &str = "google";

/// Format a native Google document is downloaded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportTarget {
    /// Export MIME type.
    pub mime_type: &'static str,
    /// Extension appended to the display name, without the dot.
    pub extension: &'static str,
}

/// Returns the export format for a native document type.
pub fn export_target(mime_type: &str) -> Option<ExportTarget> {
    let (mime_type, extension) = match mime_type {
        mime_types::DOCUMENT => (mime_types::DOCX, "docx"),
        mime_types::SPREADSHEET => (mime_types::XLSX, "xlsx"),
        mime_types::DRAWING => (mime_types::PNG, "png"),
        mime_types::PRESENTATION => (mime_types::PPTX, "pptx"),
        _ => return None,
    };
    Some(ExportTarget {
        mime_type,
        extension,
    })
}

/// Returns true for Google-native types that have no binary content of
/// their own. Folders and shortcuts are excluded.
pub fn is_native_document(mime_type: &str) -> bool {
    mime_type.starts_with(mime_types::NATIVE_PREFIX)
        && mime_type != mime_types::FOLDER
        && mime_type != mime_types::SHORTCUT
}

/// Substitutes a shortcut's id and MIME type with its target's.
///
/// Non-shortcuts and shortcuts without target details are returned as is.
pub fn resolve_shortcut(file: &DriveFile) -> DriveFile {
    let mut resolved = file.clone();
    if let Some(details) = &file.shortcut_details {
        if file.is_shortcut() && !details.target_id.is_empty() {
            resolved.id = details.target_id.clone();
            resolved.mime_type = details.target_mime_type.clone();
        }
    }
    resolved
}

/// How a file's bytes are obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Direct `alt=media` download.
    Media {
        /// File id.
        file_id: String,
        /// Content type of the bytes.
        content_type: String,
    },
    /// `export` of a native document.
    Export {
        /// File id.
        file_id: String,
        /// Export format.
        target: ExportTarget,
    },
    /// The file has no downloadable content.
    Unavailable(UnavailableReason),
}

/// Decides how to fetch the content of `file`, after shortcut resolution.
pub fn content_source(file: &DriveFile) -> ContentSource {
    let file = resolve_shortcut(file);
    if file.is_folder() {
        return ContentSource::Unavailable(UnavailableReason::NoExportTarget(file.mime_type));
    }
    if is_native_document(&file.mime_type) {
        return match export_target(&file.mime_type) {
            Some(target) => ContentSource::Export {
                file_id: file.id,
                target,
            },
            None => ContentSource::Unavailable(UnavailableReason::NoExportTarget(file.mime_type)),
        };
    }
    let content_type = if file.mime_type.is_empty() {
        mime_types::OCTET_STREAM.to_string()
    } else {
        file.mime_type
    };
    ContentSource::Media {
        file_id: file.id,
        content_type,
    }
}

/// Display name of a file, with the export extension for native documents.
pub fn display_name(file: &DriveFile) -> String {
    let file = resolve_shortcut(file);
    match export_target(&file.mime_type) {
        Some(target) => format!("{}.{}", file.name, target.extension),
        None => file.name,
    }
}

/// Opaque token identifying an item in host URLs.
///
/// Encoded as URL-safe base64 (no padding) of the JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemHash {
    /// Authenticated host user.
    pub user_id: i64,
    /// Storage type.
    #[serde(rename = "Type")]
    pub storage_type: String,
    /// Always empty for Drive items.
    pub path: String,
    /// Drive file id.
    pub name: String,
    /// Display name.
    pub file_name: String,
}

/// Failure to decode an [`ItemHash`].
#[derive(Debug, Error)]
pub enum ItemHashError {
    /// Not valid base64.
    #[error("invalid item hash encoding: {0}")]
    Encoding(#[from] base64::DecodeError),
    /// Not the expected JSON object.
    #[error("invalid item hash payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl ItemHash {
    /// Creates a hash for a Drive item.
    pub fn new(user_id: i64, file_id: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            user_id,
            storage_type: STORAGE_TYPE.to_string(),
            path: String::new(),
            name: file_id.into(),
            file_name: file_name.into(),
        }
    }

    /// Encodes the hash.
    pub fn encode(&self) -> String {
        // Serializing a struct of strings and integers cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decodes a hash produced by [`ItemHash::encode`].
    pub fn decode(encoded: &str) -> Result<Self, ItemHashError> {
        let json = URL_SAFE_NO_PAD.decode(encoded)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// An action the host offers on an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    /// Open the folder.
    List {},
    /// View the file.
    View {
        /// Host URL.
        url: String,
    },
    /// Download the file.
    Download {
        /// Host URL.
        url: String,
    },
}

impl FileAction {
    /// Action name as the host knows it.
    pub fn name(&self) -> &'static str {
        match self {
            FileAction::List {} => "list",
            FileAction::View { .. } => "view",
            FileAction::Download { .. } => "download",
        }
    }
}

/// The host's generic representation of a file or folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GenericFileItem {
    /// Drive file id.
    pub id: String,
    /// Storage type, `"google"`.
    pub type_str: String,
    /// Always empty for Drive items.
    pub path: String,
    /// Drive file id; the host addresses items by it.
    pub full_path: String,
    /// Display name.
    pub name: String,
    /// Folder flag.
    pub is_folder: bool,
    /// Always true for Drive items.
    pub is_external: bool,
    /// Content type of the downloadable bytes.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Unix timestamp.
    pub last_modified: i64,
    /// Whether a thumbnail is available.
    pub thumb: bool,
    /// Thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Offered actions, in display order.
    #[serde(default)]
    pub actions: Vec<FileAction>,
    /// Set on host items that merely link to a URL.
    #[serde(default)]
    pub is_link: bool,
    /// Target of a link item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    /// Storage type that owns the link target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
}

impl GenericFileItem {
    /// Appends an action.
    pub fn add_action(&mut self, action: FileAction) {
        self.actions.push(action);
    }

    /// Puts an action first.
    pub fn unshift_action(&mut self, action: FileAction) {
        self.actions.insert(0, action);
    }

    /// Returns true if an action with this name is offered.
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.iter().any(|a| a.name() == name)
    }

    /// Names of the offered actions, in order.
    pub fn action_names(&self) -> Vec<&'static str> {
        self.actions.iter().map(FileAction::name).collect()
    }
}

/// Per-request inputs to the mapping.
#[derive(Debug, Clone, Copy)]
pub struct MappingContext {
    /// Authenticated host user, embedded in item hashes.
    pub user_id: i64,
    /// Thumbnail URL behaviour.
    pub thumbnail_mode: ThumbnailMode,
    /// Which timestamp becomes `LastModified`.
    pub last_modified_source: LastModifiedSource,
}

impl MappingContext {
    /// Context with default thumbnail and timestamp behaviour.
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            thumbnail_mode: ThumbnailMode::default(),
            last_modified_source: LastModifiedSource::default(),
        }
    }
}

/// Why a Drive file could not be mapped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// A required field was absent.
    #[error("Drive file is missing {0}")]
    MissingField(&'static str),
}

/// Maps a Drive file to a generic item.
pub fn map_item(file: &DriveFile, ctx: &MappingContext) -> Result<GenericFileItem, MappingError> {
    let resolved = resolve_shortcut(file);
    if resolved.id.is_empty() {
        return Err(MappingError::MissingField("id"));
    }
    if resolved.mime_type.is_empty() {
        return Err(MappingError::MissingField("mimeType"));
    }

    let export = export_target(&resolved.mime_type);
    let name = match export {
        Some(target) => format!("{}.{}", resolved.name, target.extension),
        None => resolved.name.clone(),
    };
    let is_folder = resolved.is_folder();

    let mut item = GenericFileItem {
        id: resolved.id.clone(),
        type_str: STORAGE_TYPE.to_string(),
        path: String::new(),
        full_path: resolved.id.clone(),
        name,
        is_folder,
        is_external: true,
        content_type: export
            .map(|t| t.mime_type.to_string())
            .unwrap_or_else(|| resolved.mime_type.clone()),
        size: resolved.size_bytes(),
        ..Default::default()
    };

    let hash = ItemHash::new(ctx.user_id, &item.full_path, &item.name).encode();

    if is_folder {
        item.add_action(FileAction::List {});
    } else {
        item.add_action(FileAction::View {
            url: format!("?download-file/{}/view", hash),
        });
        item.add_action(FileAction::Download {
            url: format!("?download-file/{}", hash),
        });
    }

    if let Some(link) = resolved.thumbnail_link.as_deref().filter(|l| !l.is_empty()) {
        item.thumb = true;
        item.thumbnail_url = Some(match ctx.thumbnail_mode {
            ThumbnailMode::Direct => link.to_string(),
            ThumbnailMode::Proxied => format!("?file-thumbnail/{}", hash),
        });
    }

    let timestamp = match ctx.last_modified_source {
        LastModifiedSource::Created => resolved.created_time,
        LastModifiedSource::Modified => resolved.modified_time.or(resolved.created_time),
    };
    item.last_modified = timestamp.map(|t| t.timestamp()).unwrap_or(0);

    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ShortcutDetails;
    use chrono::{TimeZone, Utc};

    fn file(id: &str, name: &str, mime: &str) -> DriveFile {
        DriveFile {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: mime.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_folder_has_only_list_action() {
        let item = map_item(&file("f1", "Docs", mime_types::FOLDER), &MappingContext::new(7)).unwrap();
        assert!(item.is_folder);
        assert_eq!(item.action_names(), vec!["list"]);
        assert_eq!(item.full_path, "f1");
        assert_eq!(item.type_str, "google");
        assert!(item.is_external);
    }

    #[test]
    fn test_file_has_view_and_download() {
        let item = map_item(&file("x1", "a.pdf", "application/pdf"), &MappingContext::new(7)).unwrap();
        assert!(!item.is_folder);
        assert_eq!(item.action_names(), vec!["view", "download"]);
        assert!(!item.has_action("list"));

        let hash = ItemHash::new(7, "x1", "a.pdf").encode();
        assert_eq!(
            item.actions[0],
            FileAction::View {
                url: format!("?download-file/{}/view", hash)
            }
        );
        assert_eq!(
            item.actions[1],
            FileAction::Download {
                url: format!("?download-file/{}", hash)
            }
        );
    }

    #[test]
    fn test_native_documents_get_export_extension() {
        let cases = [
            (mime_types::DOCUMENT, "Report.docx", mime_types::DOCX),
            (mime_types::SPREADSHEET, "Report.xlsx", mime_types::XLSX),
            (mime_types::DRAWING, "Report.png", mime_types::PNG),
            (mime_types::PRESENTATION, "Report.pptx", mime_types::PPTX),
        ];
        for (mime, name, export) in cases {
            let item = map_item(&file("d", "Report", mime), &MappingContext::new(1)).unwrap();
            assert_eq!(item.name, name);
            assert_eq!(item.content_type, export);
            assert!(matches!(
                content_source(&file("d", "Report", mime)),
                ContentSource::Export { .. }
            ));
        }
    }

    #[test]
    fn test_unknown_native_type_has_no_content() {
        let form = file("f", "Survey", "application/vnd.google-apps.form");
        assert_eq!(display_name(&form), "Survey");
        assert_eq!(
            content_source(&form),
            ContentSource::Unavailable(UnavailableReason::NoExportTarget(
                "application/vnd.google-apps.form".to_string()
            ))
        );
    }

    #[test]
    fn test_binary_file_downloads_media() {
        assert_eq!(
            content_source(&file("b", "a.bin", "application/zip")),
            ContentSource::Media {
                file_id: "b".to_string(),
                content_type: "application/zip".to_string()
            }
        );
    }

    #[test]
    fn test_shortcut_resolution_is_idempotent() {
        let mut shortcut = file("s1", "Link to doc", mime_types::SHORTCUT);
        shortcut.shortcut_details = Some(ShortcutDetails {
            target_id: "t1".to_string(),
            target_mime_type: mime_types::DOCUMENT.to_string(),
        });

        let once = resolve_shortcut(&shortcut);
        let twice = resolve_shortcut(&once);
        assert_eq!(once, twice);
        assert_eq!(once.id, "t1");
        assert_eq!(once.mime_type, mime_types::DOCUMENT);

        let item = map_item(&shortcut, &MappingContext::new(1)).unwrap();
        assert_eq!(item.id, "t1");
        assert_eq!(item.name, "Link to doc.docx");
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        assert_eq!(
            map_item(&file("", "x", "text/plain"), &MappingContext::new(1)),
            Err(MappingError::MissingField("id"))
        );
        assert_eq!(
            map_item(&file("x", "x", ""), &MappingContext::new(1)),
            Err(MappingError::MissingField("mimeType"))
        );
    }

    #[test]
    fn test_thumbnail_modes() {
        let mut image = file("i", "pic.jpg", "image/jpeg");
        image.thumbnail_link = Some("https://lh3.googleusercontent.com/abc".to_string());

        let item = map_item(&image, &MappingContext::new(1)).unwrap();
        assert!(item.thumb);
        assert_eq!(
            item.thumbnail_url.as_deref(),
            Some("https://lh3.googleusercontent.com/abc")
        );

        let ctx = MappingContext {
            thumbnail_mode: ThumbnailMode::Proxied,
            ..MappingContext::new(1)
        };
        let item = map_item(&image, &ctx).unwrap();
        let url = item.thumbnail_url.unwrap();
        assert!(url.starts_with("?file-thumbnail/"));

        let plain = map_item(&file("p", "a.txt", "text/plain"), &MappingContext::new(1)).unwrap();
        assert!(!plain.thumb);
        assert!(plain.thumbnail_url.is_none());
    }

    #[test]
    fn test_last_modified_source() {
        let mut doc = file("m", "a.txt", "text/plain");
        doc.created_time = Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        doc.modified_time = Some(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap());

        let item = map_item(&doc, &MappingContext::new(1)).unwrap();
        assert_eq!(item.last_modified, 1_577_836_800);

        let ctx = MappingContext {
            last_modified_source: LastModifiedSource::Modified,
            ..MappingContext::new(1)
        };
        let item = map_item(&doc, &ctx).unwrap();
        assert_eq!(item.last_modified, 1_685_577_600);
    }

    #[test]
    fn test_item_hash_decodes() {
        let hash = ItemHash::new(42, "abc", "Report.docx");
        let decoded = ItemHash::decode(&hash.encode()).unwrap();
        assert_eq!(decoded, hash);
        assert_eq!(decoded.storage_type, "google");
        assert!(decoded.path.is_empty());

        assert!(ItemHash::decode("***").is_err());
    }

    #[test]
    fn test_generic_item_wire_shape() {
        let item = map_item(&file("f1", "Docs", mime_types::FOLDER), &MappingContext::new(7)).unwrap();
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["Id"], "f1");
        assert_eq!(json["FullPath"], "f1");
        assert_eq!(json["IsFolder"], true);
        assert_eq!(json["TypeStr"], "google");
        assert_eq!(json["Actions"][0], serde_json::json!({"list": {}}));
    }
}
