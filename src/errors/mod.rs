//! Error types for the Google Drive storage connector.
//!
//! Two layers live here:
//! - [`GoogleDriveError`]: what a single Drive API call can fail with.
//! - [`ConnectorError`]: what a storage operation reports back to the host.

use std::time::Duration;
use thiserror::Error;

/// Result type for Google Drive API calls.
pub type GoogleDriveResult<T> = Result<T, GoogleDriveError>;

/// Result type for storage operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Failure of a Drive API call, grouped by what went wrong.
#[derive(Debug, Error)]
pub enum GoogleDriveError {
    /// Connector configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Credentials were missing, rejected or could not be refreshed.
    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthenticationError),

    /// Drive refused the operation for this account.
    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    /// The request was malformed.
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// The target item is missing or locked.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Storage or rate limits were hit.
    #[error("Quota error: {0}")]
    Quota(#[from] QuotaError),

    /// Upload could not be completed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// A native document could not be exported.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// The connection failed or timed out.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Drive answered with a 5xx.
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// Drive's answer could not be decoded.
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),
}

impl GoogleDriveError {
    /// Invalid configuration.
    pub fn configuration(msg: impl Into<String>) -> Self {
        ConfigurationError::InvalidConfiguration(msg.into()).into()
    }

    /// A required argument was empty.
    pub fn missing_parameter(msg: impl Into<String>) -> Self {
        RequestError::MissingParameter(msg.into()).into()
    }

    /// The item does not exist.
    pub fn not_found(msg: impl Into<String>) -> Self {
        ResourceError::FileNotFound(msg.into()).into()
    }

    /// A response body did not decode.
    pub fn deserialization(msg: impl Into<String>) -> Self {
        ResponseError::DeserializationError(msg.into()).into()
    }

    /// Returns true if Drive reported the item as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GoogleDriveError::Resource(ResourceError::FileNotFound(_)))
    }

    /// Returns true if the access token was rejected or could not be renewed.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GoogleDriveError::Authentication(_))
    }

    /// `Retry-After` hint carried by rate-limit and 503 answers.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GoogleDriveError::Quota(QuotaError::UserRateLimitExceeded { retry_after, .. })
            | GoogleDriveError::Quota(QuotaError::ProjectRateLimitExceeded {
                retry_after, ..
            })
            | GoogleDriveError::Server(ServerError::ServiceUnavailable { retry_after, .. }) => {
                *retry_after
            }
            _ => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A setting has an unusable value.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An endpoint URL does not parse.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Credential errors.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// Drive rejected the bearer token.
    #[error("Access token rejected: {0}")]
    InvalidToken(String),

    /// The token endpoint failed.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// The refresh token was revoked or expired.
    #[error("Refresh token rejected: {0}")]
    InvalidGrant(String),

    /// Reading or writing the linked account failed.
    #[error("Account store error: {0}")]
    AccountStore(String),
}

/// Permission errors.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    /// Generic 403.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The account lacks rights on the item.
    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    /// A Workspace domain policy blocks the operation.
    #[error("Blocked by domain policy: {0}")]
    DomainPolicy(String),
}

/// Request errors.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Drive rejected the request.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A parameter value was rejected.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A required argument was empty.
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// The `q` search expression was rejected.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Any other 4xx answer.
    #[error("Request rejected (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Drive's message.
        message: String,
    },
}

/// Item errors.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// No such file or folder.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// The item is read-only for this account.
    #[error("Cannot modify item: {0}")]
    CannotModify(String),
}

/// Limit errors.
#[derive(Debug, Error)]
pub enum QuotaError {
    /// The Drive is full.
    #[error("Storage quota exceeded: {message}")]
    StorageQuotaExceeded {
        /// Drive's message.
        message: String,
    },

    /// Per-user rate limit.
    #[error("User rate limit exceeded: {message}")]
    UserRateLimitExceeded {
        /// Drive's message.
        message: String,
        /// Server hint.
        retry_after: Option<Duration>,
    },

    /// Per-project rate limit.
    #[error("Project rate limit exceeded: {message}")]
    ProjectRateLimitExceeded {
        /// Drive's message.
        message: String,
        /// Server hint.
        retry_after: Option<Duration>,
    },
}

/// Upload errors.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The upload request did not complete.
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// The host's payload could not be read.
    #[error("Upload payload unreadable: {0}")]
    PayloadUnreadable(String),

    /// The payload is larger than the configured limit.
    #[error("Upload too large: {0}")]
    UploadSizeExceeded(String),
}

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Drive refuses to export documents above its size limit.
    #[error("Export too large: {0}")]
    ExportSizeExceeded(String),
}

/// Connection errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Could not connect.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// No answer in time.
    #[error("Request timeout: {0}")]
    Timeout(String),
}

/// 5xx answers.
#[derive(Debug, Error)]
pub enum ServerError {
    /// 500 or an unmapped status.
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// 500 with reason `backendError`.
    #[error("Backend error: {0}")]
    BackendError(String),

    /// 503.
    #[error("Service unavailable: {message}")]
    ServiceUnavailable {
        /// Drive's message.
        message: String,
        /// Server hint.
        retry_after: Option<Duration>,
    },

    /// 502.
    #[error("Bad gateway: {0}")]
    BadGateway(String),
}

/// Decoding errors.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The body did not match the expected shape.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// The transport produced something unusable.
    #[error("Unexpected response: {0}")]
    UnexpectedFormat(String),
}

/// Errors raised below the HTTP status layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connect failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Anything else reqwest reports.
    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Network(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

impl From<TransportError> for GoogleDriveError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(msg) => NetworkError::Timeout(msg).into(),
            TransportError::Network(msg) => NetworkError::ConnectionFailed(msg).into(),
            TransportError::Http(msg) => ResponseError::UnexpectedFormat(msg).into(),
        }
    }
}

/// Why a storage operation could not be served by this provider.
///
/// Unavailability is not a failure: the host treats it as "not handled here"
/// and falls through to other storages or its default path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnavailableReason {
    /// The provider-level Google integration is switched off.
    #[error("Google integration is disabled")]
    ProviderDisabled,

    /// This module is disabled in its own settings.
    #[error("Google Drive module is disabled")]
    ModuleDisabled,

    /// The storage scope has not been granted.
    #[error("storage scope not granted: {0}")]
    ScopeNotGranted(String),

    /// The user has no linked Google account.
    #[error("no Google account linked for user {0}")]
    NoAccount(i64),

    /// No usable access token could be obtained.
    #[error("no usable access token: {0}")]
    TokenUnavailable(String),

    /// The Drive client could not be constructed.
    #[error("client construction failed: {0}")]
    ClientConstruction(String),

    /// The request targets another storage type.
    #[error("storage type {0:?} is not served by this provider")]
    UnsupportedType(String),

    /// The shared link does not contain a Drive file id.
    #[error("unrecognized Drive link: {0}")]
    MalformedLink(String),

    /// A native Drive document has no export format.
    #[error("no export format for {0}")]
    NoExportTarget(String),
}

/// Error returned from storage operations to the host.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The provider cannot serve this request.
    #[error("Storage unavailable: {0}")]
    Unavailable(#[from] UnavailableReason),

    /// The host passed malformed arguments.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The authenticated user may not perform this operation.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// A Drive API call failed.
    #[error("Remote call failed: {0}")]
    Remote(#[from] GoogleDriveError),
}

impl ConnectorError {
    /// Creates an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        ConnectorError::InvalidRequest(msg.into())
    }

    /// Returns true if the host should fall through to another provider.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ConnectorError::Unavailable(_))
    }

    /// Returns the unavailability reason, if any.
    pub fn unavailable_reason(&self) -> Option<&UnavailableReason> {
        match self {
            ConnectorError::Unavailable(reason) => Some(reason),
            _ => None,
        }
    }
}
