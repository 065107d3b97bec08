//! Shared harness: a wiremock server standing in for both the Drive API and
//! Google's token endpoint.

#![allow(dead_code)]

use chrono::Utc;
use integrations_google_drive_storage::auth::{InMemoryAccountStore, OAuthAccount};
use integrations_google_drive_storage::config::{GoogleDriveConfig, GoogleDriveConfigBuilder};
use integrations_google_drive_storage::connector::DriveConnector;
use integrations_google_drive_storage::provider::{UserContext, UserRole};
use integrations_google_drive_storage::settings::{ModuleSettings, ProviderSettings};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USER_ID: i64 = 7;
pub const STORED_TOKEN: &str = "stored-token";
pub const FRESH_TOKEN: &str = "fresh-token";
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Starts the mock server.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Config builder pointed at the mock server.
pub fn config_builder(server: &MockServer) -> GoogleDriveConfigBuilder {
    GoogleDriveConfig::builder()
        .base_url(format!("{}/drive/v3/", server.uri()))
        .upload_url(format!("{}/upload/drive/v3/", server.uri()))
        .token_url(format!("{}/token", server.uri()))
}

/// Token blob issued just now.
pub fn valid_token_blob(token: &str) -> String {
    json!({
        "access_token": token,
        "token_type": "Bearer",
        "expires_in": 3600,
        "created": Utc::now().timestamp()
    })
    .to_string()
}

/// Token blob that expired an hour ago.
pub fn expired_token_blob(token: &str) -> String {
    json!({
        "access_token": token,
        "token_type": "Bearer",
        "expires_in": 3600,
        "created": Utc::now().timestamp() - 7200
    })
    .to_string()
}

/// Store holding the test user's account with the storage scope.
pub async fn store_with_account(access_token_blob: &str) -> Arc<InMemoryAccountStore> {
    let store = Arc::new(InMemoryAccountStore::new());
    store
        .insert(
            OAuthAccount::new(USER_ID, access_token_blob, "stored-refresh")
                .with_scopes("auth storage"),
        )
        .await;
    store
}

/// Connector for the test user with a valid stored token.
pub async fn connector(server: &MockServer) -> DriveConnector {
    let store = store_with_account(&valid_token_blob(STORED_TOKEN)).await;
    connector_with(server, config_builder(server).build().unwrap(), store, UserRole::NormalUser)
}

/// Connector with explicit parts.
pub fn connector_with(
    _server: &MockServer,
    config: GoogleDriveConfig,
    store: Arc<InMemoryAccountStore>,
    role: UserRole,
) -> DriveConnector {
    DriveConnector::new(
        config,
        ProviderSettings::new("client-id", "client-secret"),
        ModuleSettings::with_storage(),
        UserContext::new(USER_ID, role),
        store,
    )
    .unwrap()
}

/// Mock expecting the stored bearer token.
pub fn authorized(http_method: &str) -> wiremock::MockBuilder {
    Mock::given(method(http_method)).and(header("Authorization", "Bearer stored-token"))
}

/// Mounts a token endpoint that issues [`FRESH_TOKEN`].
pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(wiremock::matchers::path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=stored-refresh"))
        .and(body_string_contains("auth%2Fdrive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": FRESH_TOKEN,
            "token_type": "Bearer",
            "expires_in": 3599,
            "scope": "https://www.googleapis.com/auth/drive"
        })))
        .mount(server)
        .await;
}

/// Drive file JSON.
pub fn drive_file(id: &str, name: &str, mime: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "mimeType": mime,
        "createdTime": "2024-01-02T03:04:05Z",
        "modifiedTime": "2024-02-03T04:05:06Z"
    })
}

/// Drive folder JSON with parents.
pub fn drive_folder(id: &str, name: &str, parents: &[&str]) -> Value {
    json!({
        "id": id,
        "name": name,
        "mimeType": FOLDER_MIME,
        "parents": parents
    })
}

/// Drive error body.
pub fn drive_error(code: u16, reason: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(code).set_body_json(json!({
        "error": {
            "code": code,
            "message": message,
            "errors": [{"domain": "global", "reason": reason, "message": message}]
        }
    }))
}
