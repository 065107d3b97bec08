//! Typed operation arguments, deserialized from the host's argument bag.

use crate::errors::{ConnectorError, ConnectorResult};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Arguments parsed from the host's PascalCase JSON bag.
pub trait HostArgs: DeserializeOwned {
    /// Checks constraints serde cannot express.
    fn validate(&self) -> ConnectorResult<()> {
        Ok(())
    }

    /// Parses and validates `args`. Missing or mistyped fields yield
    /// [`ConnectorError::InvalidRequest`].
    fn from_args(args: serde_json::Value) -> ConnectorResult<Self> {
        let parsed: Self = serde_json::from_value(args)
            .map_err(|e| ConnectorError::invalid_request(e.to_string()))?;
        parsed.validate()?;
        Ok(parsed)
    }
}

fn require(value: &str, field: &str) -> ConnectorResult<()> {
    if value.is_empty() {
        Err(ConnectorError::invalid_request(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

/// An item named in a batch; the host puts the Drive id in `Name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemRef {
    /// Drive id.
    pub name: String,
    /// Host path of the item.
    #[serde(default)]
    pub path: String,
    /// Folder flag as the host knows it.
    #[serde(default)]
    pub is_folder: bool,
}

impl ItemRef {
    /// Refers to the item with Drive id `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: String::new(),
            is_folder: false,
        }
    }
}

fn require_items(items: &[ItemRef], field: &str) -> ConnectorResult<()> {
    for (index, item) in items.iter().enumerate() {
        require(&item.name, &format!("{}[{}].Name", field, index))?;
    }
    Ok(())
}

/// Folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListArgs {
    /// Storage type.
    #[serde(rename = "Type")]
    pub storage_type: String,
    /// Host path; its last segment is the folder id.
    #[serde(default)]
    pub path: String,
    /// Name filter.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Whether to return the breadcrumb.
    #[serde(default)]
    pub path_required: bool,
}

impl HostArgs for ListArgs {}

impl ListArgs {
    /// Lists `path` of `storage_type`.
    pub fn new(storage_type: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            storage_type: storage_type.into(),
            path: path.into(),
            pattern: None,
            path_required: false,
        }
    }
}

/// A single item, addressed by Drive id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileArgs {
    /// Storage type.
    #[serde(rename = "Type")]
    pub storage_type: String,
    /// Host path.
    #[serde(default)]
    pub path: String,
    /// Drive id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

impl HostArgs for FileArgs {
    fn validate(&self) -> ConnectorResult<()> {
        require(&self.id, "Id")
    }
}

impl FileArgs {
    /// Addresses item `id` of `storage_type`.
    pub fn new(storage_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            storage_type: storage_type.into(),
            path: String::new(),
            id: id.into(),
            name: String::new(),
        }
    }
}

/// Folder creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateFolderArgs {
    /// Storage type.
    #[serde(rename = "Type")]
    pub storage_type: String,
    /// Parent folder; empty for root.
    #[serde(default)]
    pub path: String,
    /// New folder name.
    pub folder_name: String,
}

impl HostArgs for CreateFolderArgs {
    fn validate(&self) -> ConnectorResult<()> {
        require(&self.folder_name, "FolderName")
    }
}

/// Upload payload: buffered bytes or a reader drained on upload.
pub enum UploadPayload {
    /// Buffered bytes.
    Bytes(Bytes),
    /// Async reader.
    Reader(Box<dyn AsyncRead + Send + Unpin>),
}

impl Default for UploadPayload {
    fn default() -> Self {
        UploadPayload::Bytes(Bytes::new())
    }
}

impl UploadPayload {
    /// Buffers the whole payload.
    pub async fn into_bytes(self) -> std::io::Result<Bytes> {
        match self {
            UploadPayload::Bytes(bytes) => Ok(bytes),
            UploadPayload::Reader(mut reader) => {
                let mut buffer = Vec::new();
                reader.read_to_end(&mut buffer).await?;
                Ok(Bytes::from(buffer))
            }
        }
    }
}

impl From<Bytes> for UploadPayload {
    fn from(bytes: Bytes) -> Self {
        UploadPayload::Bytes(bytes)
    }
}

impl From<Vec<u8>> for UploadPayload {
    fn from(bytes: Vec<u8>) -> Self {
        UploadPayload::Bytes(Bytes::from(bytes))
    }
}

impl std::fmt::Debug for UploadPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadPayload::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            UploadPayload::Reader(_) => f.write_str("Reader"),
        }
    }
}

/// File upload. The payload is attached with [`UploadArgs::with_payload`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UploadArgs {
    /// Storage type.
    #[serde(rename = "Type")]
    pub storage_type: String,
    /// Parent folder; empty for root.
    #[serde(default)]
    pub path: String,
    /// File name; its extension decides the content type.
    pub name: String,
    /// Content.
    #[serde(skip)]
    pub data: UploadPayload,
}

impl HostArgs for UploadArgs {
    fn validate(&self) -> ConnectorResult<()> {
        require(&self.name, "Name")
    }
}

impl UploadArgs {
    /// Uploads `data` as `name` into `path`.
    pub fn new(
        storage_type: impl Into<String>,
        path: impl Into<String>,
        name: impl Into<String>,
        data: impl Into<UploadPayload>,
    ) -> Self {
        Self {
            storage_type: storage_type.into(),
            path: path.into(),
            name: name.into(),
            data: data.into(),
        }
    }

    /// Attaches the payload.
    pub fn with_payload(mut self, data: impl Into<UploadPayload>) -> Self {
        self.data = data.into();
        self
    }
}

/// Deletion of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteArgs {
    /// Storage type.
    #[serde(rename = "Type")]
    pub storage_type: String,
    /// Folder holding the items.
    #[serde(default)]
    pub path: String,
    /// Items to delete.
    pub items: Vec<ItemRef>,
}

impl HostArgs for DeleteArgs {
    fn validate(&self) -> ConnectorResult<()> {
        require_items(&self.items, "Items")
    }
}

/// Rename of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenameArgs {
    /// Storage type.
    #[serde(rename = "Type")]
    pub storage_type: String,
    /// Folder holding the item.
    #[serde(default)]
    pub path: String,
    /// Drive id.
    pub name: String,
    /// New display name.
    pub new_name: String,
}

impl HostArgs for RenameArgs {
    fn validate(&self) -> ConnectorResult<()> {
        require(&self.name, "Name")?;
        require(&self.new_name, "NewName")
    }
}

/// Move or copy of items between folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransferArgs {
    /// Source storage type.
    pub from_type: String,
    /// Destination storage type; defaults to the source's.
    #[serde(default)]
    pub to_type: Option<String>,
    /// Source folder.
    #[serde(default)]
    pub from_path: String,
    /// Destination folder; empty for root.
    #[serde(default)]
    pub to_path: String,
    /// Items to transfer.
    pub files: Vec<ItemRef>,
}

impl HostArgs for TransferArgs {
    fn validate(&self) -> ConnectorResult<()> {
        require_items(&self.files, "Files")
    }
}

/// Shared link to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LinkArgs {
    /// The link.
    #[serde(alias = "Url")]
    pub link: String,
}

impl HostArgs for LinkArgs {
    fn validate(&self) -> ConnectorResult<()> {
        require(&self.link, "Link")
    }
}

/// Quota query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QuotaArgs {
    /// Storage type.
    #[serde(rename = "Type")]
    pub storage_type: String,
}

impl HostArgs for QuotaArgs {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_args_from_host_bag() {
        let args = ListArgs::from_args(json!({
            "Type": "google",
            "Path": "/abc/def",
            "Pattern": "report",
            "PathRequired": true,
            "UserId": 5
        }))
        .unwrap();
        assert_eq!(args.storage_type, "google");
        assert_eq!(args.path, "/abc/def");
        assert_eq!(args.pattern.as_deref(), Some("report"));
        assert!(args.path_required);

        let args = ListArgs::from_args(json!({"Type": "google"})).unwrap();
        assert_eq!(args.path, "");
        assert!(!args.path_required);
    }

    #[test]
    fn test_missing_fields_are_invalid_requests() {
        let error = ListArgs::from_args(json!({"Path": "/"})).unwrap_err();
        assert!(matches!(error, ConnectorError::InvalidRequest(_)));

        let error = FileArgs::from_args(json!({"Type": "google", "Id": ""})).unwrap_err();
        assert!(matches!(error, ConnectorError::InvalidRequest(_)));

        let error = RenameArgs::from_args(json!({
            "Type": "google", "Name": "x", "NewName": ""
        }))
        .unwrap_err();
        assert!(matches!(error, ConnectorError::InvalidRequest(_)));
    }

    #[test]
    fn test_wrong_types_are_invalid_requests() {
        let error = ListArgs::from_args(json!({"Type": "google", "PathRequired": "yes"}))
            .unwrap_err();
        assert!(matches!(error, ConnectorError::InvalidRequest(_)));

        let error = DeleteArgs::from_args(json!({"Type": "google", "Items": "a"})).unwrap_err();
        assert!(matches!(error, ConnectorError::InvalidRequest(_)));
    }

    #[test]
    fn test_transfer_args() {
        let args = TransferArgs::from_args(json!({
            "FromType": "google",
            "ToType": "google",
            "FromPath": "/A",
            "ToPath": "/B",
            "Files": [{"Name": "f1"}, {"Name": "f2", "IsFolder": true}]
        }))
        .unwrap();
        assert_eq!(args.files.len(), 2);
        assert!(args.files[1].is_folder);

        let error = TransferArgs::from_args(json!({
            "FromType": "google",
            "Files": [{"Name": ""}]
        }))
        .unwrap_err();
        assert!(error.to_string().contains("Files[0].Name"));
    }

    #[test]
    fn test_link_args_accepts_url_alias() {
        let args = LinkArgs::from_args(json!({"Url": "https://drive.google.com/open?id=x"}))
            .unwrap();
        assert_eq!(args.link, "https://drive.google.com/open?id=x");
    }

    #[tokio::test]
    async fn test_upload_payload_from_reader() {
        let args = UploadArgs::from_args(json!({"Type": "google", "Name": "a.txt"}))
            .unwrap()
            .with_payload(UploadPayload::Reader(Box::new(std::io::Cursor::new(
                b"hello".to_vec(),
            ))));
        assert_eq!(args.data.into_bytes().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_upload_payload_drains_chunked_reader() {
        let reader = tokio_test::io::Builder::new()
            .read(b"first ")
            .read(b"second")
            .build();
        let payload = UploadPayload::Reader(Box::new(reader));
        let bytes = tokio_test::block_on(payload.into_bytes()).unwrap();
        assert_eq!(bytes, Bytes::from_static(b"first second"));
    }
}
