//! Configuration for the Google Drive storage connector.

use crate::errors::{ConfigurationError, GoogleDriveError, GoogleDriveResult};
use std::time::Duration;
use url::Url;

/// Default Drive v3 API base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3/";

/// Default Drive v3 upload base URL.
pub const DEFAULT_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/";

/// Default OAuth 2.0 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Default position of the storage in the host's storage list.
pub const DEFAULT_STORAGE_ORDER: i32 = 200;

/// Host-relative icon shown for linked Drive folders.
pub const DEFAULT_FOLDER_ICON_URL: &str = "modules/GoogleDrive/images/drive.png";

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const MAX_PAGE_SIZE: u32 = 1000;

/// How delete requests are carried out on Drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Move items to the Drive trash.
    #[default]
    Trash,
    /// Delete items permanently.
    Permanent,
}

/// How thumbnail URLs are exposed on generic items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThumbnailMode {
    /// Hand out Drive's `thumbnailLink` as is.
    #[default]
    Direct,
    /// Hand out a host URL that proxies the thumbnail through the connector.
    Proxied,
}

/// Which Drive timestamp becomes `LastModified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LastModifiedSource {
    /// `createdTime`.
    #[default]
    Created,
    /// `modifiedTime`.
    Modified,
}

/// Configuration for the Google Drive connector.
#[derive(Debug, Clone)]
pub struct GoogleDriveConfig {
    /// Base URL for the API. Always ends with `/`.
    pub base_url: Url,

    /// Upload URL for the API. Always ends with `/`.
    pub upload_url: Url,

    /// OAuth 2.0 token endpoint.
    pub token_url: Url,

    /// Default timeout for requests.
    pub timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// User agent string.
    pub user_agent: String,

    /// Page size for `files.list`; provider default when unset.
    pub page_size: Option<u32>,

    /// `orderBy` for `files.list`; provider order when unset.
    pub order_by: Option<String>,

    /// Delete behaviour.
    pub delete_mode: DeleteMode,

    /// Thumbnail URL behaviour.
    pub thumbnail_mode: ThumbnailMode,

    /// Source of `LastModified`.
    pub last_modified_source: LastModifiedSource,

    /// Icon used as thumbnail for linked Drive folders.
    pub folder_icon_url: String,

    /// Order of the storage entry advertised to the host.
    pub storage_order: i32,

    /// Upper bound on buffered upload payloads.
    pub max_upload_size: Option<u64>,
}

impl GoogleDriveConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> GoogleDriveConfigBuilder {
        GoogleDriveConfigBuilder::new()
    }

    /// Loads configuration from `GOOGLE_DRIVE_*` environment variables.
    ///
    /// Unset variables fall back to defaults.
    pub fn from_env() -> GoogleDriveResult<Self> {
        let mut builder = Self::builder();

        if let Ok(url) = std::env::var("GOOGLE_DRIVE_BASE_URL") {
            builder = builder.base_url(url);
        }
        if let Ok(url) = std::env::var("GOOGLE_DRIVE_UPLOAD_URL") {
            builder = builder.upload_url(url);
        }
        if let Ok(url) = std::env::var("GOOGLE_DRIVE_TOKEN_URL") {
            builder = builder.token_url(url);
        }
        if let Some(secs) = env_parse::<u64>("GOOGLE_DRIVE_TIMEOUT_SECS") {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = env_parse::<u64>("GOOGLE_DRIVE_CONNECT_TIMEOUT_SECS") {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(size) = env_parse::<u32>("GOOGLE_DRIVE_PAGE_SIZE") {
            builder = builder.page_size(size);
        }
        if let Ok(order_by) = std::env::var("GOOGLE_DRIVE_ORDER_BY") {
            builder = builder.order_by(order_by);
        }
        if let Ok(mode) = std::env::var("GOOGLE_DRIVE_DELETE_MODE") {
            builder = builder.delete_mode(match mode.to_ascii_lowercase().as_str() {
                "permanent" => DeleteMode::Permanent,
                "trash" => DeleteMode::Trash,
                other => {
                    return Err(ConfigurationError::InvalidConfiguration(format!(
                        "unknown delete mode: {}",
                        other
                    ))
                    .into())
                }
            });
        }
        if let Ok(mode) = std::env::var("GOOGLE_DRIVE_THUMBNAIL_MODE") {
            builder = builder.thumbnail_mode(match mode.to_ascii_lowercase().as_str() {
                "proxied" => ThumbnailMode::Proxied,
                "direct" => ThumbnailMode::Direct,
                other => {
                    return Err(ConfigurationError::InvalidConfiguration(format!(
                        "unknown thumbnail mode: {}",
                        other
                    ))
                    .into())
                }
            });
        }
        if let Ok(source) = std::env::var("GOOGLE_DRIVE_LAST_MODIFIED") {
            builder = builder.last_modified_source(match source.to_ascii_lowercase().as_str() {
                "modified" => LastModifiedSource::Modified,
                "created" => LastModifiedSource::Created,
                other => {
                    return Err(ConfigurationError::InvalidConfiguration(format!(
                        "unknown last-modified source: {}",
                        other
                    ))
                    .into())
                }
            });
        }
        if let Ok(icon) = std::env::var("GOOGLE_DRIVE_FOLDER_ICON_URL") {
            builder = builder.folder_icon_url(icon);
        }
        if let Some(order) = env_parse::<i32>("GOOGLE_DRIVE_STORAGE_ORDER") {
            builder = builder.storage_order(order);
        }
        if let Some(max) = env_parse::<u64>("GOOGLE_DRIVE_MAX_UPLOAD_SIZE") {
            builder = builder.max_upload_size(max);
        }

        builder.build()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> GoogleDriveResult<()> {
        require_secure("Base URL", &self.base_url)?;
        require_secure("Upload URL", &self.upload_url)?;
        require_secure("Token URL", &self.token_url)?;

        if let Some(size) = self.page_size {
            if size == 0 || size > MAX_PAGE_SIZE {
                return Err(GoogleDriveError::Configuration(
                    ConfigurationError::InvalidConfiguration(format!(
                        "Page size must be between 1 and {}",
                        MAX_PAGE_SIZE
                    )),
                ));
            }
        }

        if self.timeout.is_zero() {
            return Err(GoogleDriveError::Configuration(
                ConfigurationError::InvalidConfiguration("Timeout must be positive".to_string()),
            ));
        }

        Ok(())
    }
}

impl Default for GoogleDriveConfig {
    fn default() -> Self {
        Self {
            base_url: default_url(DEFAULT_BASE_URL),
            upload_url: default_url(DEFAULT_UPLOAD_URL),
            token_url: default_url(DEFAULT_TOKEN_URL),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            user_agent: default_user_agent(),
            page_size: None,
            order_by: None,
            delete_mode: DeleteMode::default(),
            thumbnail_mode: ThumbnailMode::default(),
            last_modified_source: LastModifiedSource::default(),
            folder_icon_url: DEFAULT_FOLDER_ICON_URL.to_string(),
            storage_order: DEFAULT_STORAGE_ORDER,
            max_upload_size: None,
        }
    }
}

/// Builder for GoogleDriveConfig.
#[derive(Debug, Default)]
pub struct GoogleDriveConfigBuilder {
    base_url: Option<String>,
    upload_url: Option<String>,
    token_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    page_size: Option<u32>,
    order_by: Option<String>,
    delete_mode: Option<DeleteMode>,
    thumbnail_mode: Option<ThumbnailMode>,
    last_modified_source: Option<LastModifiedSource>,
    folder_icon_url: Option<String>,
    storage_order: Option<i32>,
    max_upload_size: Option<u64>,
}

impl GoogleDriveConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the upload URL.
    pub fn upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = Some(url.into());
        self
    }

    /// Sets the OAuth token endpoint.
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the user agent string.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the listing page size.
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Sets the listing order.
    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// Sets the delete mode.
    pub fn delete_mode(mut self, mode: DeleteMode) -> Self {
        self.delete_mode = Some(mode);
        self
    }

    /// Sets the thumbnail mode.
    pub fn thumbnail_mode(mut self, mode: ThumbnailMode) -> Self {
        self.thumbnail_mode = Some(mode);
        self
    }

    /// Sets the `LastModified` source.
    pub fn last_modified_source(mut self, source: LastModifiedSource) -> Self {
        self.last_modified_source = Some(source);
        self
    }

    /// Sets the icon for linked Drive folders.
    pub fn folder_icon_url(mut self, url: impl Into<String>) -> Self {
        self.folder_icon_url = Some(url.into());
        self
    }

    /// Sets the storage order.
    pub fn storage_order(mut self, order: i32) -> Self {
        self.storage_order = Some(order);
        self
    }

    /// Sets the maximum upload size in bytes.
    pub fn max_upload_size(mut self, bytes: u64) -> Self {
        self.max_upload_size = Some(bytes);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> GoogleDriveResult<GoogleDriveConfig> {
        let defaults = GoogleDriveConfig::default();

        let config = GoogleDriveConfig {
            base_url: match self.base_url {
                Some(url) => parse_base(&url)?,
                None => defaults.base_url,
            },
            upload_url: match self.upload_url {
                Some(url) => parse_base(&url)?,
                None => defaults.upload_url,
            },
            token_url: match self.token_url {
                Some(url) => parse_url(&url)?,
                None => defaults.token_url,
            },
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            page_size: self.page_size,
            order_by: self.order_by,
            delete_mode: self.delete_mode.unwrap_or_default(),
            thumbnail_mode: self.thumbnail_mode.unwrap_or_default(),
            last_modified_source: self.last_modified_source.unwrap_or_default(),
            folder_icon_url: self.folder_icon_url.unwrap_or(defaults.folder_icon_url),
            storage_order: self.storage_order.unwrap_or(defaults.storage_order),
            max_upload_size: self.max_upload_size,
        };

        config.validate()?;

        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn default_user_agent() -> String {
    format!("integrations-google-drive-storage/{}", env!("CARGO_PKG_VERSION"))
}

fn default_url(url: &str) -> Url {
    // Constants above are valid absolute URLs.
    Url::parse(url).unwrap_or_else(|_| unreachable!("invalid built-in URL {}", url))
}

fn parse_url(url: &str) -> GoogleDriveResult<Url> {
    Url::parse(url).map_err(|e| {
        GoogleDriveError::Configuration(ConfigurationError::InvalidUrl(format!("{}: {}", url, e)))
    })
}

/// Parses a base URL, adding the trailing slash `Url::join` needs to keep
/// the last path segment.
fn parse_base(url: &str) -> GoogleDriveResult<Url> {
    if url.ends_with('/') {
        parse_url(url)
    } else {
        parse_url(&format!("{}/", url))
    }
}

fn require_secure(label: &str, url: &Url) -> GoogleDriveResult<()> {
    if url.scheme() == "https" {
        return Ok(());
    }
    let loopback = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1") | Some("[::1]"));
    if url.scheme() == "http" && loopback {
        return Ok(());
    }
    Err(GoogleDriveError::Configuration(
        ConfigurationError::InvalidConfiguration(format!("{} must use HTTPS", label)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GoogleDriveConfig::builder().build().unwrap();

        assert_eq!(config.base_url.as_str(), "https://www.googleapis.com/drive/v3/");
        assert_eq!(
            config.upload_url.as_str(),
            "https://www.googleapis.com/upload/drive/v3/"
        );
        assert_eq!(config.token_url.as_str(), "https://oauth2.googleapis.com/token");
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.delete_mode, DeleteMode::Trash);
        assert_eq!(config.thumbnail_mode, ThumbnailMode::Direct);
        assert_eq!(config.last_modified_source, LastModifiedSource::Created);
        assert_eq!(config.storage_order, 200);
        assert_eq!(config.folder_icon_url, "modules/GoogleDrive/images/drive.png");
        assert!(config.page_size.is_none());
        assert!(config.order_by.is_none());
    }

    #[test]
    fn test_custom_config() {
        let config = GoogleDriveConfig::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("test-agent/1.0")
            .page_size(100)
            .order_by("folder,name")
            .delete_mode(DeleteMode::Permanent)
            .storage_order(10)
            .build()
            .unwrap();

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "test-agent/1.0");
        assert_eq!(config.page_size, Some(100));
        assert_eq!(config.order_by.as_deref(), Some("folder,name"));
        assert_eq!(config.delete_mode, DeleteMode::Permanent);
        assert_eq!(config.storage_order, 10);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = GoogleDriveConfig::builder()
            .base_url("https://drive.example.com/drive/v3")
            .build()
            .unwrap();

        assert_eq!(config.base_url.as_str(), "https://drive.example.com/drive/v3/");
        assert_eq!(
            config.base_url.join("files").unwrap().as_str(),
            "https://drive.example.com/drive/v3/files"
        );
    }

    #[test]
    fn test_plain_http_rejected_except_loopback() {
        let result = GoogleDriveConfig::builder()
            .base_url("http://drive.example.com/drive/v3")
            .build();
        assert!(result.is_err());

        let config = GoogleDriveConfig::builder()
            .base_url("http://127.0.0.1:8080/drive/v3")
            .token_url("http://localhost:8080/token")
            .build();
        assert!(config.is_ok());
    }

    #[test]
    fn test_invalid_page_size() {
        assert!(GoogleDriveConfig::builder().page_size(0).build().is_err());
        assert!(GoogleDriveConfig::builder().page_size(1001).build().is_err());
        assert!(GoogleDriveConfig::builder().page_size(1000).build().is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let result = GoogleDriveConfig::builder().base_url("not a url").build();
        assert!(matches!(
            result,
            Err(GoogleDriveError::Configuration(ConfigurationError::InvalidUrl(_)))
        ));
    }
}
