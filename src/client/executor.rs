//! Authorized request execution and Drive error decoding.

use crate::auth::AuthProvider;
use crate::config::GoogleDriveConfig;
use crate::errors::{
    AuthorizationError, AuthenticationError, ExportError, GoogleDriveError, GoogleDriveResult,
    QuotaError, RequestError, ResourceError, ResponseError, ServerError,
};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestBody};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Characters escaped when a value is placed in a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encodes a file id for use as a path segment.
pub fn path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Query parameters for a request.
pub type QueryParams<'a> = &'a [(&'a str, String)];

/// Sends Drive requests with the user's bearer token.
///
/// A 401 triggers one token refresh and one retry. Non-2xx answers become
/// [`GoogleDriveError`]s.
pub struct RequestExecutor {
    config: GoogleDriveConfig,
    transport: Arc<dyn HttpTransport>,
    auth: Arc<dyn AuthProvider>,
}

impl RequestExecutor {
    /// Executor over `transport`, authorized by `auth`.
    pub fn new(
        config: GoogleDriveConfig,
        transport: Arc<dyn HttpTransport>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            config,
            transport,
            auth,
        }
    }

    /// Endpoint and limit settings.
    pub fn config(&self) -> &GoogleDriveConfig {
        &self.config
    }

    /// Calls the API endpoint and decodes a JSON answer.
    pub async fn execute_request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        query: QueryParams<'_>,
        body: RequestBody,
    ) -> GoogleDriveResult<T> {
        let response = self.execute_request_raw(method, path, query, body).await?;
        parse_json(&response)
    }

    /// Calls the API endpoint and returns the body as is.
    pub async fn execute_request_raw(
        &self,
        method: HttpMethod,
        path: &str,
        query: QueryParams<'_>,
        body: RequestBody,
    ) -> GoogleDriveResult<HttpResponse> {
        let url = self.build_url(path, query)?;
        self.send_authorized(method, url, body).await
    }

    /// Calls the upload endpoint and decodes a JSON answer.
    pub async fn execute_upload<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        query: QueryParams<'_>,
        body: RequestBody,
    ) -> GoogleDriveResult<T> {
        let url = self.build_upload_url(path, query)?;
        let response = self.send_authorized(method, url, body).await?;
        parse_json(&response)
    }

    /// Performs an authenticated GET of an absolute URL, such as a
    /// thumbnail link.
    pub async fn execute_absolute_raw(&self, url: Url) -> GoogleDriveResult<HttpResponse> {
        self.send_authorized(HttpMethod::Get, url, RequestBody::Empty)
            .await
    }

    /// API URL for `path` relative to the base URL.
    pub fn build_url(&self, path: &str, query: QueryParams<'_>) -> GoogleDriveResult<Url> {
        join_url(&self.config.base_url, path, query)
    }

    /// Upload URL for `path`.
    pub fn build_upload_url(&self, path: &str, query: QueryParams<'_>) -> GoogleDriveResult<Url> {
        join_url(&self.config.upload_url, path, query)
    }

    async fn send_authorized(
        &self,
        method: HttpMethod,
        url: Url,
        body: RequestBody,
    ) -> GoogleDriveResult<HttpResponse> {
        let token = self
            .auth
            .get_access_token()
            .await
            .map_err(GoogleDriveError::Authentication)?;

        debug!(method = ?method, url = %url, "Sending Drive request");

        let request = HttpRequest {
            method,
            url,
            headers: self.headers(&token.authorization_header())?,
            body,
        };

        let response = self.transport.send(request.clone()).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return check_status(response);
        }

        debug!(url = %request.url, "Access token rejected, re-authenticating");
        let token = self
            .auth
            .refresh_token()
            .await
            .map_err(GoogleDriveError::Authentication)?;

        let retry = HttpRequest {
            headers: self.headers(&token.authorization_header())?,
            ..request
        };
        let response = self.transport.send(retry).await?;
        if response.status == StatusCode::UNAUTHORIZED {
            warn!("Drive rejected a freshly refreshed access token");
        }
        check_status(response)
    }

    fn headers(&self, authorization: &str) -> GoogleDriveResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(authorization).map_err(|e| {
                GoogleDriveError::Authentication(AuthenticationError::InvalidToken(format!(
                    "Invalid auth header: {}",
                    e
                )))
            })?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.config.user_agent).map_err(|e| {
                GoogleDriveError::Request(RequestError::ValidationError(format!(
                    "Invalid user agent: {}",
                    e
                )))
            })?,
        );
        Ok(headers)
    }
}

fn join_url(base: &Url, path: &str, query: QueryParams<'_>) -> GoogleDriveResult<Url> {
    let mut url = base.join(path.trim_start_matches('/')).map_err(|e| {
        GoogleDriveError::Request(RequestError::ValidationError(format!("Invalid URL: {}", e)))
    })?;

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

fn parse_json<T: DeserializeOwned>(response: &HttpResponse) -> GoogleDriveResult<T> {
    serde_json::from_slice(&response.body).map_err(|e| {
        GoogleDriveError::Response(ResponseError::DeserializationError(format!(
            "Failed to deserialize response: {}",
            e
        )))
    })
}

fn check_status(response: HttpResponse) -> GoogleDriveResult<HttpResponse> {
    if response.status.is_success() {
        Ok(response)
    } else {
        Err(handle_error_response(&response))
    }
}

#[derive(serde::Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(serde::Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(default)]
    errors: Option<Vec<ErrorItem>>,
}

#[derive(serde::Deserialize)]
struct ErrorItem {
    reason: Option<String>,
}

/// Maps HTTP status codes and Google error reasons to domain errors.
pub(crate) fn handle_error_response(response: &HttpResponse) -> GoogleDriveError {
    let status = response.status;

    let error_detail: Option<ErrorResponse> = serde_json::from_slice(&response.body).ok();

    let (message, reason) = match error_detail {
        Some(e) => {
            let reason = e
                .error
                .errors
                .as_ref()
                .and_then(|errs| errs.first())
                .and_then(|err| err.reason.clone());
            (e.error.message, reason)
        }
        None => (
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&response.body)
            ),
            None,
        ),
    };

    let retry_after = response
        .headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs);

    match status {
        StatusCode::BAD_REQUEST => match reason.as_deref() {
            Some("invalidParameter") => {
                GoogleDriveError::Request(RequestError::InvalidParameter(message))
            }
            Some("invalidQuery") => GoogleDriveError::Request(RequestError::InvalidQuery(message)),
            _ => GoogleDriveError::Request(RequestError::ValidationError(message)),
        },
        StatusCode::UNAUTHORIZED => {
            GoogleDriveError::Authentication(AuthenticationError::InvalidToken(message))
        }
        StatusCode::FORBIDDEN => match reason.as_deref() {
            Some("userRateLimitExceeded") => {
                GoogleDriveError::Quota(QuotaError::UserRateLimitExceeded {
                    message,
                    retry_after,
                })
            }
            Some("rateLimitExceeded") => {
                GoogleDriveError::Quota(QuotaError::ProjectRateLimitExceeded {
                    message,
                    retry_after,
                })
            }
            Some("storageQuotaExceeded") => {
                GoogleDriveError::Quota(QuotaError::StorageQuotaExceeded { message })
            }
            Some("exportSizeLimitExceeded") => {
                GoogleDriveError::Export(ExportError::ExportSizeExceeded(message))
            }
            Some("cannotModifyFile") | Some("fileNotWritable") => {
                GoogleDriveError::Resource(ResourceError::CannotModify(message))
            }
            Some("insufficientPermissions") | Some("insufficientFilePermissions") => {
                GoogleDriveError::Authorization(AuthorizationError::InsufficientPermissions(
                    message,
                ))
            }
            Some("domainPolicy") => {
                GoogleDriveError::Authorization(AuthorizationError::DomainPolicy(message))
            }
            _ => GoogleDriveError::Authorization(AuthorizationError::Forbidden(message)),
        },
        StatusCode::NOT_FOUND => GoogleDriveError::Resource(ResourceError::FileNotFound(message)),
        StatusCode::TOO_MANY_REQUESTS => {
            GoogleDriveError::Quota(QuotaError::UserRateLimitExceeded {
                message,
                retry_after,
            })
        }
        StatusCode::INTERNAL_SERVER_ERROR => match reason.as_deref() {
            Some("backendError") => GoogleDriveError::Server(ServerError::BackendError(message)),
            _ => GoogleDriveError::Server(ServerError::InternalError(message)),
        },
        StatusCode::BAD_GATEWAY => GoogleDriveError::Server(ServerError::BadGateway(message)),
        StatusCode::SERVICE_UNAVAILABLE => {
            GoogleDriveError::Server(ServerError::ServiceUnavailable {
                message,
                retry_after,
            })
        }
        _ if status.is_client_error() => GoogleDriveError::Request(RequestError::Rejected {
            status: status.as_u16(),
            message,
        }),
        _ => GoogleDriveError::Server(ServerError::InternalError(format!(
            "HTTP {}: {}",
            status.as_u16(),
            message
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            Bytes::from(body.to_string()),
        )
    }

    fn google_error(code: u16, reason: &str) -> String {
        format!(
            r#"{{"error":{{"code":{},"message":"boom","errors":[{{"reason":"{}","message":"boom"}}]}}}}"#,
            code, reason
        )
    }

    #[test]
    fn test_build_url() {
        let base = Url::parse("https://www.googleapis.com/drive/v3/").unwrap();

        let url = join_url(&base, "/files", &[]).unwrap();
        assert_eq!(url.as_str(), "https://www.googleapis.com/drive/v3/files");

        let url = join_url(&base, "files/123", &[("fields", "id,name".to_string())]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/drive/v3/files/123?fields=id%2Cname"
        );
    }

    #[test]
    fn test_path_segment_encoding() {
        assert_eq!(path_segment("abc-123_X"), "abc-123_X");
        assert_eq!(path_segment("a/b c"), "a%2Fb%20c");
        assert_eq!(path_segment("../x?y#z"), "..%2Fx%3Fy%23z");
    }

    #[test]
    fn test_error_mapping() {
        let error = handle_error_response(&response(404, &google_error(404, "notFound")));
        assert!(error.is_not_found());

        let error = handle_error_response(&response(403, &google_error(403, "storageQuotaExceeded")));
        assert!(matches!(
            error,
            GoogleDriveError::Quota(QuotaError::StorageQuotaExceeded { .. })
        ));

        let error = handle_error_response(&response(403, &google_error(403, "insufficientFilePermissions")));
        assert!(matches!(
            error,
            GoogleDriveError::Authorization(AuthorizationError::InsufficientPermissions(_))
        ));

        let error = handle_error_response(&response(400, &google_error(400, "invalidQuery")));
        assert!(matches!(
            error,
            GoogleDriveError::Request(RequestError::InvalidQuery(_))
        ));

        let error = handle_error_response(&response(409, &google_error(409, "conflict")));
        assert!(matches!(
            error,
            GoogleDriveError::Request(RequestError::Rejected { status: 409, .. })
        ));
        assert!(error.retry_after().is_none());

        let error = handle_error_response(&response(504, "timeout"));
        assert!(matches!(
            error,
            GoogleDriveError::Server(ServerError::InternalError(_))
        ));

        let error = handle_error_response(&response(401, "unauthorized"));
        assert!(error.is_unauthorized());

        let error = handle_error_response(&response(502, "<html>"));
        assert!(matches!(
            error,
            GoogleDriveError::Server(ServerError::BadGateway(_))
        ));
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("12"));
        let response = HttpResponse::new(
            StatusCode::SERVICE_UNAVAILABLE,
            headers,
            Bytes::from_static(b"{}"),
        );
        let error = handle_error_response(&response);
        assert_eq!(error.retry_after(), Some(Duration::from_secs(12)));
    }
}
