//! OAuth 2.0 `refresh_token` grant against Google's token endpoint.

use super::StoredAccessToken;
use crate::errors::AuthenticationError;
use crate::transport::{HttpMethod, HttpRequest, HttpTransport, RequestBody};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Exchanges refresh tokens for access tokens.
pub struct TokenRefresher {
    transport: Arc<dyn HttpTransport>,
    token_url: Url,
    client_id: String,
    client_secret: SecretString,
    scope: Option<String>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    grant_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'a str>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenRefresher {
    /// Creates a refresher for the given client credentials.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        token_url: Url,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        Self {
            transport,
            token_url,
            client_id: client_id.into(),
            client_secret,
            scope: None,
        }
    }

    /// Restricts refreshed tokens to `scopes`.
    pub fn with_scopes(mut self, scopes: &[&str]) -> Self {
        self.scope = Some(scopes.join(" ")).filter(|s| !s.is_empty());
        self
    }

    /// Performs the grant and returns the token in its persisted shape,
    /// stamped with the current time as `created`.
    pub async fn refresh(
        &self,
        refresh_token: &SecretString,
    ) -> Result<StoredAccessToken, AuthenticationError> {
        if refresh_token.expose_secret().is_empty() {
            return Err(AuthenticationError::InvalidGrant(
                "account has no refresh token".to_string(),
            ));
        }

        let form = serde_urlencoded::to_string(RefreshRequest {
            client_id: &self.client_id,
            client_secret: self.client_secret.expose_secret(),
            refresh_token: refresh_token.expose_secret(),
            grant_type: "refresh_token",
            scope: self.scope.as_deref(),
        })
        .map_err(|e| AuthenticationError::RefreshFailed(format!("Failed to encode form: {}", e)))?;

        debug!(url = %self.token_url, "Refreshing access token");

        let request = HttpRequest::new(HttpMethod::Post, self.token_url.clone())
            .with_body(RequestBody::Form(form));

        let response = self.transport.send(request).await.map_err(|e| {
            AuthenticationError::RefreshFailed(format!("HTTP request failed: {}", e))
        })?;

        if !response.status.is_success() {
            let status = response.status;
            if let Ok(error) = serde_json::from_slice::<OAuthErrorResponse>(&response.body) {
                let message = error.error_description.unwrap_or_else(|| error.error.clone());
                if error.error == "invalid_grant" {
                    return Err(AuthenticationError::InvalidGrant(message));
                }
                return Err(AuthenticationError::RefreshFailed(format!(
                    "Token refresh failed with status {}: {}",
                    status, message
                )));
            }
            return Err(AuthenticationError::RefreshFailed(format!(
                "Token refresh failed with status {}: {}",
                status,
                String::from_utf8_lossy(&response.body)
            )));
        }

        let refreshed: RefreshResponse = serde_json::from_slice(&response.body).map_err(|e| {
            AuthenticationError::RefreshFailed(format!("Failed to parse response: {}", e))
        })?;

        if refreshed.access_token.is_empty() {
            return Err(AuthenticationError::RefreshFailed(
                "Token endpoint returned an empty access token".to_string(),
            ));
        }

        Ok(StoredAccessToken {
            access_token: refreshed.access_token,
            token_type: refreshed.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_in: refreshed.expires_in.unwrap_or(3600),
            created: Some(Utc::now().timestamp()),
            scope: refreshed.scope,
            refresh_token: refreshed.refresh_token,
        })
    }
}
