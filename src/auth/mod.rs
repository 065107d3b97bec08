//! Authentication for Google Drive.
//!
//! Credentials come from the host's OAuth account store rather than from
//! static configuration:
//! - [`OAuthAccount`] is the host record holding the serialized access token
//!   and the refresh token.
//! - [`StoredAccessToken`] is the JSON token blob kept in that record.
//! - [`TokenRefresher`] performs the `refresh_token` grant.
//! - [`AccountTokenProvider`] ties these together behind [`AuthProvider`],
//!   persisting every refreshed token back to the store.

mod account;
mod provider;
mod refresh;

pub use account::{
    scope_list_contains, InMemoryAccountStore, OAuthAccount, OAuthAccountStore, GOOGLE_PROVIDER,
};
pub use provider::AccountTokenProvider;
pub use refresh::TokenRefresher;

use crate::errors::AuthenticationError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Tokens are treated as expired this many seconds before their real expiry.
pub const TOKEN_EXPIRY_BUFFER_SECONDS: i64 = 30;

/// OAuth 2.0 scopes.
pub mod scopes {
    /// Full access to Drive files.
    pub const DRIVE: &str = "https://www.googleapis.com/auth/drive";

    /// The user's email address.
    pub const USERINFO_EMAIL: &str = "https://www.googleapis.com/auth/userinfo.email";

    /// The user's basic profile.
    pub const USERINFO_PROFILE: &str = "https://www.googleapis.com/auth/userinfo.profile";

    /// Scopes the connector's client works with.
    pub const CLIENT_SCOPES: [&str; 3] = [USERINFO_EMAIL, USERINFO_PROFILE, DRIVE];
}

/// Authentication provider abstraction.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Get an access token for API requests.
    async fn get_access_token(&self) -> Result<AccessToken, AuthenticationError>;

    /// Force refresh the access token.
    async fn refresh_token(&self) -> Result<AccessToken, AuthenticationError>;

    /// Check if the current token is expired.
    fn is_expired(&self) -> bool;
}

/// Access token with metadata.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The token string.
    pub token: SecretString,

    /// Token type (usually "Bearer").
    pub token_type: String,

    /// Expiration time.
    pub expires_at: DateTime<Utc>,

    /// Scopes granted.
    pub scopes: Vec<String>,
}

impl AccessToken {
    /// Creates a new access token.
    pub fn new(
        token: impl Into<String>,
        token_type: impl Into<String>,
        expires_at: DateTime<Utc>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            token: SecretString::new(token.into()),
            token_type: token_type.into(),
            expires_at,
            scopes,
        }
    }

    /// Checks if the token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        let threshold = self.expires_at - Duration::seconds(TOKEN_EXPIRY_BUFFER_SECONDS);
        Utc::now() >= threshold
    }

    /// Returns the authorization header value.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.token.expose_secret())
    }
}

/// The token blob persisted in the account's `AccessToken` field.
///
/// Shape: `{"access_token", "token_type", "expires_in", "created"}`, with
/// `created` in Unix seconds.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredAccessToken {
    /// Bearer token.
    pub access_token: String,

    /// Token type.
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Lifetime in seconds, counted from `created`.
    #[serde(default)]
    pub expires_in: i64,

    /// Issue time in Unix seconds. Tokens without it count as expired.
    #[serde(default)]
    pub created: Option<i64>,

    /// Space-separated granted scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Refresh token, when the token endpoint rotated it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl std::fmt::Debug for StoredAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredAccessToken")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

impl StoredAccessToken {
    /// Parses the stored blob.
    pub fn parse(blob: &str) -> Result<Self, AuthenticationError> {
        let token: StoredAccessToken = serde_json::from_str(blob)
            .map_err(|e| AuthenticationError::InvalidToken(format!("unreadable token: {}", e)))?;
        if token.access_token.is_empty() {
            return Err(AuthenticationError::InvalidToken(
                "stored token has no access_token".to_string(),
            ));
        }
        Ok(token)
    }

    /// Serializes the token for persisting.
    pub fn to_json(&self) -> Result<String, AuthenticationError> {
        serde_json::to_string(self)
            .map_err(|e| AuthenticationError::InvalidToken(format!("unserializable token: {}", e)))
    }

    /// Absolute expiry, if the issue time is known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let created = self.created?;
        Utc.timestamp_opt(created + self.expires_in, 0).single()
    }

    /// Checks expiry with the safety window applied.
    pub fn is_expired(&self) -> bool {
        match self.expires_at() {
            Some(expires_at) => {
                Utc::now() >= expires_at - Duration::seconds(TOKEN_EXPIRY_BUFFER_SECONDS)
            }
            None => true,
        }
    }

    /// Converts to an [`AccessToken`] for request signing.
    pub fn to_access_token(&self) -> AccessToken {
        let scopes = self
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_default();
        AccessToken::new(
            self.access_token.clone(),
            self.token_type.clone(),
            self.expires_at().unwrap_or_else(Utc::now),
            scopes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stored_token() {
        let now = Utc::now().timestamp();
        let blob = format!(
            r#"{{"access_token":"ya29.abc","token_type":"Bearer","expires_in":3599,"created":{}}}"#,
            now
        );
        let token = StoredAccessToken::parse(&blob).unwrap();
        assert_eq!(token.access_token, "ya29.abc");
        assert!(!token.is_expired());
        assert_eq!(
            token.expires_at().unwrap().timestamp(),
            now + 3599
        );
    }

    #[test]
    fn test_unparseable_tokens() {
        assert!(StoredAccessToken::parse("").is_err());
        assert!(StoredAccessToken::parse("not json").is_err());
        assert!(StoredAccessToken::parse(r#"{"access_token":""}"#).is_err());
    }

    #[test]
    fn test_expiry_buffer() {
        let now = Utc::now().timestamp();
        let token = StoredAccessToken {
            access_token: "t".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 20,
            created: Some(now),
            scope: None,
            refresh_token: None,
        };
        // Inside the 30 second window.
        assert!(token.is_expired());

        let no_created = StoredAccessToken {
            created: None,
            expires_in: 3600,
            ..token
        };
        assert!(no_created.is_expired());
    }

    #[test]
    fn test_round_trip_keeps_shape() {
        let token = StoredAccessToken {
            access_token: "t".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            created: Some(1_700_000_000),
            scope: None,
            refresh_token: None,
        };
        let json: serde_json::Value = serde_json::from_str(&token.to_json().unwrap()).unwrap();
        assert_eq!(json["access_token"], "t");
        assert_eq!(json["expires_in"], 3600);
        assert_eq!(json["created"], 1_700_000_000);
        assert!(json.get("scope").is_none());
    }

    #[test]
    fn test_access_token_header() {
        let token = AccessToken::new(
            "abc",
            "Bearer",
            Utc::now() + Duration::hours(1),
            vec![],
        );
        assert_eq!(token.authorization_header(), "Bearer abc");
        assert!(!token.is_expired());

        let token = AccessToken::new("abc", "Bearer", Utc::now(), vec![]);
        assert!(token.is_expired());
    }

    #[test]
    fn test_debug_hides_token() {
        let token = StoredAccessToken::parse(r#"{"access_token":"secret-value"}"#).unwrap();
        assert!(!format!("{:?}", token).contains("secret-value"));
    }
}
