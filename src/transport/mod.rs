//! Buffered HTTP exchange underneath the Drive client and the token refresher.
//!
//! Requests and responses are fully buffered; Drive payloads handled here
//! never stream.

use crate::config::GoogleDriveConfig;
use crate::errors::TransportError;
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use url::Url;

/// Sends one request and buffers the answer.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs `request`. Non-2xx statuses are returned, not raised.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Verb.
    pub method: HttpMethod,
    /// Absolute URL, query included.
    pub url: Url,
    /// Extra headers; `Authorization` is set by the executor.
    pub headers: HeaderMap,
    /// Payload.
    pub body: RequestBody,
}

impl HttpRequest {
    /// Creates a request without body or headers.
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }
}

/// Verbs the connector uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// Reads, downloads, exports.
    Get,
    /// Creation, copy, upload, token refresh.
    Post,
    /// Rename, trash, move.
    Patch,
    /// Permanent delete.
    Delete,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// Payload of a request.
#[derive(Clone)]
pub enum RequestBody {
    /// No payload.
    Empty,
    /// JSON document.
    Json(Bytes),
    /// `application/x-www-form-urlencoded` form.
    Form(String),
    /// Upload with metadata.
    Multipart(MultipartBody),
}

impl RequestBody {
    /// Serializes `value` into a JSON body.
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(RequestBody::Json(Bytes::from(serde_json::to_vec(value)?)))
    }

    /// Content type header for this body, if any.
    pub fn content_type(&self) -> Option<String> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Json(_) => Some("application/json".to_string()),
            RequestBody::Form(_) => Some("application/x-www-form-urlencoded".to_string()),
            RequestBody::Multipart(multipart) => Some(multipart.content_type_header()),
        }
    }

    /// Encoded body bytes.
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Json(bytes) => Some(bytes),
            RequestBody::Form(form) => Some(Bytes::from(form)),
            RequestBody::Multipart(multipart) => Some(multipart.to_bytes()),
        }
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestBody::Empty => write!(f, "Empty"),
            RequestBody::Json(bytes) => write!(f, "Json({} bytes)", bytes.len()),
            // Forms carry client secrets and refresh tokens.
            RequestBody::Form(_) => write!(f, "Form(..)"),
            RequestBody::Multipart(multipart) => {
                write!(f, "Multipart({} bytes)", multipart.content.len())
            }
        }
    }
}

/// `multipart/related` body for Drive uploads: a JSON metadata part
/// followed by the media part.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    /// JSON file metadata.
    pub metadata: Bytes,
    /// File bytes.
    pub content: Bytes,
    /// Content type of the media part.
    pub content_type: String,
    /// Part separator.
    pub boundary: String,
}

impl MultipartBody {
    /// Builds an upload body with a fresh boundary.
    pub fn new(metadata: Bytes, content: Bytes, content_type: impl Into<String>) -> Self {
        Self {
            metadata,
            content,
            content_type: content_type.into(),
            boundary: Self::generate_boundary(),
        }
    }

    fn generate_boundary() -> String {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        format!("==============={}==", nanos)
    }

    /// Wire encoding.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.metadata.len() + self.content.len() + 256);

        out.put_slice(format!("--{}\r\n", self.boundary).as_bytes());
        out.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        out.put_slice(&self.metadata);
        out.put_slice(b"\r\n");

        out.put_slice(format!("--{}\r\n", self.boundary).as_bytes());
        out.put_slice(format!("Content-Type: {}\r\n\r\n", self.content_type).as_bytes());
        out.put_slice(&self.content);
        out.put_slice(format!("\r\n--{}--", self.boundary).as_bytes());

        out.freeze()
    }

    /// `Content-Type` header announcing the boundary.
    pub fn content_type_header(&self) -> String {
        format!("multipart/related; boundary={}", self.boundary)
    }
}

/// Buffered answer.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status, successful or not.
    pub status: StatusCode,
    /// Headers as received.
    pub headers: HeaderMap,
    /// Whole body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Assembles a response.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the `Content-Type` header, if present and valid.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// [`HttpTransport`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Wraps an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a transport with timeouts and user agent taken from `config`.
    pub fn from_config(config: &GoogleDriveConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Http(format!("Failed to create client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method: Method = request.method.into();
        let mut req = self.client.request(method, request.url);

        for (key, value) in request.headers.iter() {
            req = req.header(key, value);
        }

        if let Some(content_type) = request.body.content_type() {
            if !request.headers.contains_key(CONTENT_TYPE) {
                let value = HeaderValue::from_str(&content_type)
                    .map_err(|e| TransportError::Http(format!("Invalid content type: {}", e)))?;
                req = req.header(CONTENT_TYPE, value);
            }
        }

        if let Some(bytes) = request.body.into_bytes() {
            req = req.body(bytes);
        }

        let response = req.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(HttpResponse::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_body() {
        let metadata = Bytes::from(r#"{"name":"test.txt"}"#);
        let content = Bytes::from("Hello, World!");
        let multipart = MultipartBody::new(metadata, content, "text/plain");

        let bytes = multipart.to_bytes();
        let text = String::from_utf8_lossy(&bytes);
        let content_type = multipart.content_type_header();

        assert!(content_type.starts_with("multipart/related; boundary="));
        assert!(text.starts_with(&format!("--{}\r\n", multipart.boundary)));
        assert!(text.contains(r#"{"name":"test.txt"}"#));
        assert!(text.contains("Content-Type: text/plain\r\n\r\nHello, World!"));
        assert!(text.ends_with(&format!("--{}--", multipart.boundary)));
    }

    #[test]
    fn test_body_content_types() {
        assert_eq!(RequestBody::Empty.content_type(), None);
        assert_eq!(
            RequestBody::Form("a=b".to_string()).content_type().as_deref(),
            Some("application/x-www-form-urlencoded")
        );
        let json = RequestBody::json(&serde_json::json!({"name": "x"})).unwrap();
        assert_eq!(json.content_type().as_deref(), Some("application/json"));
        assert_eq!(json.into_bytes().unwrap(), Bytes::from(r#"{"name":"x"}"#));
    }

    #[test]
    fn test_form_body_is_not_logged() {
        let body = RequestBody::Form("refresh_token=secret".to_string());
        assert!(!format!("{:?}", body).contains("secret"));
    }

    #[test]
    fn test_http_method_conversion() {
        assert_eq!(Method::from(HttpMethod::Get), Method::GET);
        assert_eq!(Method::from(HttpMethod::Post), Method::POST);
        assert_eq!(Method::from(HttpMethod::Patch), Method::PATCH);
        assert_eq!(Method::from(HttpMethod::Delete), Method::DELETE);
    }
}
