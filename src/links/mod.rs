//! Drive shared links and `.url` internet shortcut files.

use crate::mapping::{FileAction, GenericFileItem, STORAGE_TYPE};
use crate::types::DriveFile;
use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Host marker of Drive links.
pub const DRIVE_HOST_MARKER: &str = "drive.google.com";

static PATH_ID_LINK: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"https://\w+\.google\.com/\w+/d/(.*?)/.*").ok());

static OPEN_ID_LINK: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"https://\w+\.google\.com/open\?id=(.*)").ok());

/// Extracts the Drive file id from a shared link.
///
/// Recognized shapes are `https://<host>.google.com/<kind>/d/<id>/...` and
/// `https://<host>.google.com/open?id=<id>`.
pub fn extract_drive_id(link: &str) -> Option<String> {
    let captures = |re: &Lazy<Option<Regex>>| re.as_ref().and_then(|re| re.captures(link));
    captures(&PATH_ID_LINK)
        .or_else(|| captures(&OPEN_ID_LINK))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}

/// Returns true if the URL points at Google Drive.
pub fn is_drive_link(url: &str) -> bool {
    url.contains(DRIVE_HOST_MARKER)
}

/// A host path that goes through a `.url` file, optionally followed by an
/// item id inside the linked storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlFilePath {
    /// Path of the `.url` file itself.
    pub url_file: String,
    /// Trailing id after the `.url` file, if any.
    pub trailing_id: Option<String>,
}

impl UrlFilePath {
    /// Splits `path` at the first `.url`. Paths without one yield `None`.
    pub fn split(path: &str) -> Option<Self> {
        let index = path.find(".url")?;
        let (head, rest) = path.split_at(index + ".url".len());
        let trailing_id = rest
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        Some(Self {
            url_file: head.to_string(),
            trailing_id,
        })
    }

    /// Directory of the `.url` file.
    pub fn dirname(&self) -> &str {
        match self.url_file.rfind('/') {
            Some(0) => "/",
            Some(index) => &self.url_file[..index],
            None => "",
        }
    }

    /// File name of the `.url` file.
    pub fn basename(&self) -> &str {
        self.url_file
            .rsplit('/')
            .next()
            .unwrap_or(self.url_file.as_str())
    }
}

/// Reads the `URL=` entry of an INI-format internet shortcut.
pub fn parse_url_file(contents: &str) -> Option<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';') && !line.starts_with('#'))
        .filter(|line| !line.starts_with('['))
        .filter_map(|line| line.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("URL"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Where a request through a Drive `.url` file is redirected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlFileRedirect {
    /// Storage type, always `"google"`.
    pub storage_type: String,
    /// Drive file id.
    pub id: String,
}

/// Resolves a `.url` file that points at Drive.
///
/// A trailing id in the host path takes precedence over the id in the link.
pub fn redirect_url_file(path: &UrlFilePath, contents: &str) -> Option<UrlFileRedirect> {
    let url = parse_url_file(contents)?;
    if !is_drive_link(&url) {
        return None;
    }
    let id = path
        .trailing_id
        .clone()
        .or_else(|| extract_drive_id(&url))?;
    Some(UrlFileRedirect {
        storage_type: STORAGE_TYPE.to_string(),
        id,
    })
}

impl UrlFileRedirect {
    /// Rewrites a request's storage type and path to the redirect target.
    pub fn apply(&self, storage_type: &mut String, path: &mut String) {
        storage_type.clone_from(&self.storage_type);
        path.clone_from(&self.id);
    }
}

/// Reads files from the host's other storages.
#[async_trait]
pub trait HostFileReader: Send + Sync {
    /// Contents of `name` in folder `path` of `storage_type`, if readable.
    async fn read_file(&self, storage_type: &str, path: &str, name: &str) -> Option<Bytes>;
}

/// Follows a host path through a `.url` file that points at Drive.
///
/// Returns `None` when the path has no `.url` component, the file cannot be
/// read, or it points elsewhere.
pub async fn resolve_url_file(
    storage_type: &str,
    path: &str,
    reader: &dyn HostFileReader,
) -> Option<UrlFileRedirect> {
    let url_path = UrlFilePath::split(path)?;
    let contents = reader
        .read_file(storage_type, url_path.dirname(), url_path.basename())
        .await?;
    let contents = String::from_utf8_lossy(&contents);
    let redirect = redirect_url_file(&url_path, &contents);
    debug!(path, redirected = redirect.is_some(), "Checked .url file");
    redirect
}

/// Decorates a host link item with what Drive reports about its target.
///
/// Returns false for items that are not Drive links.
pub fn apply_link_info(
    item: &mut GenericFileItem,
    info: Option<&DriveFile>,
    folder_icon_url: &str,
) -> bool {
    let is_drive = item.is_link
        && item
            .link_url
            .as_deref()
            .map(is_drive_link)
            .unwrap_or(false);
    if !is_drive {
        return false;
    }

    item.link_type = Some(STORAGE_TYPE.to_string());

    if let Some(info) = info {
        if let Some(link) = info.thumbnail_link.as_deref().filter(|l| !l.is_empty()) {
            item.thumb = true;
            item.thumbnail_url = Some(link.to_string());
        }
        if info.is_folder() {
            item.unshift_action(FileAction::List {});
            item.thumb = true;
            item.thumbnail_url = Some(folder_icon_url.to_string());
        } else if info.size.is_some() {
            item.size = info.size_bytes();
        }
    }

    true
}
