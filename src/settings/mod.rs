//! Host-persisted settings: provider enablement, client credentials and the
//! module's granted scopes.

use crate::auth::{scope_list_contains, scopes, OAuthAccount};
use crate::errors::UnavailableReason;
use crate::provider::UserRole;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// The scope name that enables Drive as a file storage.
pub const STORAGE_SCOPE: &str = "storage";

/// Settings of the provider-level Google integration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// Master switch for every Google-backed module.
    #[serde(rename = "EnableModule", default)]
    pub enable_module: bool,

    /// OAuth client id.
    #[serde(rename = "Id", default)]
    pub client_id: String,

    /// OAuth client secret.
    #[serde(rename = "Secret", default = "empty_secret")]
    pub client_secret: SecretString,
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new())
}

impl ProviderSettings {
    /// Creates enabled provider settings with the given client credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            enable_module: true,
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
        }
    }
}

/// Settings of this module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSettings {
    /// Turns the module off entirely.
    #[serde(rename = "Disabled", default)]
    pub disabled: bool,

    /// Space-separated list of granted scope names.
    #[serde(rename = "Scopes", default)]
    pub scopes: String,
}

impl ModuleSettings {
    /// Settings with only the storage scope granted.
    pub fn with_storage() -> Self {
        Self {
            disabled: false,
            scopes: STORAGE_SCOPE.to_string(),
        }
    }

    /// Returns true if `scope` is among the granted scopes.
    pub fn has_scope(&self, scope: &str) -> bool {
        scope_list_contains(&self.scopes, scope)
    }

    /// Applies an update from the settings screen.
    ///
    /// An enabled `storage` entry grants the storage scope; anything else
    /// clears the scope list.
    pub fn update_scopes(&mut self, entries: &[ScopeSetting]) {
        let granted = entries
            .iter()
            .any(|entry| entry.name == STORAGE_SCOPE && entry.value);
        self.scopes = if granted {
            STORAGE_SCOPE.to_string()
        } else {
            String::new()
        };
    }
}

/// A scope toggle shown on the settings screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScopeSetting {
    /// Scope name.
    pub name: String,
    /// Human-readable label.
    #[serde(default)]
    pub description: String,
    /// Whether the scope is granted.
    pub value: bool,
}

/// Label of the storage toggle.
pub const STORAGE_SCOPE_DESCRIPTION: &str = "Files storage";

/// Expands a `|`-separated scope list into the OAuth scope URLs this module
/// contributes to the consent request.
pub fn populate_scopes(requested: &str) -> Vec<&'static str> {
    if scope_list_contains(requested, STORAGE_SCOPE) {
        vec![scopes::DRIVE]
    } else {
        Vec::new()
    }
}

/// Builds the scope toggles shown to a user on the settings screen.
///
/// Super-admins see the module-level grant. Normal users and tenant admins
/// see their account's grant, and only when the module grants storage.
pub fn scope_settings(
    role: UserRole,
    module: &ModuleSettings,
    account: Option<&OAuthAccount>,
) -> Vec<ScopeSetting> {
    let mut result = Vec::new();
    let entry = |value: bool| ScopeSetting {
        name: STORAGE_SCOPE.to_string(),
        description: STORAGE_SCOPE_DESCRIPTION.to_string(),
        value,
    };

    match role {
        UserRole::SuperAdmin => result.push(entry(module.has_scope(STORAGE_SCOPE))),
        UserRole::NormalUser | UserRole::TenantAdmin => {
            if module.has_scope(STORAGE_SCOPE) {
                let value = account
                    .map(|a| a.has_scope(STORAGE_SCOPE))
                    .unwrap_or(false);
                result.push(entry(value));
            }
        }
        UserRole::Anonymous => {}
    }

    result
}

/// Checks the provider and module switches that gate every operation.
pub fn check_enabled(
    provider: &ProviderSettings,
    module: &ModuleSettings,
) -> Result<(), UnavailableReason> {
    if !provider.enable_module {
        return Err(UnavailableReason::ProviderDisabled);
    }
    if module.disabled {
        return Err(UnavailableReason::ModuleDisabled);
    }
    if !module.has_scope(STORAGE_SCOPE) {
        return Err(UnavailableReason::ScopeNotGranted("module".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn account(scopes: &str) -> OAuthAccount {
        OAuthAccount::new(1, "{}", "refresh").with_scopes(scopes)
    }

    #[test]
    fn test_deserialize_host_settings() {
        let provider: ProviderSettings = serde_json::from_str(
            r#"{"EnableModule": true, "Id": "client-id", "Secret": "client-secret"}"#,
        )
        .unwrap();
        assert!(provider.enable_module);
        assert_eq!(provider.client_id, "client-id");
        assert_eq!(provider.client_secret.expose_secret(), "client-secret");

        let module: ModuleSettings =
            serde_json::from_str(r#"{"Disabled": false, "Scopes": "auth storage"}"#).unwrap();
        assert!(module.has_scope("storage"));
        assert!(module.has_scope("auth"));
        assert!(!module.has_scope("stor"));

        let module: ModuleSettings =
            serde_json::from_str(r#"{"Scopes": "auth|storage"}"#).unwrap();
        assert!(module.has_scope("storage"));

        let module: ModuleSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(module, ModuleSettings::default());
    }

    #[test]
    fn test_populate_scopes() {
        assert_eq!(
            populate_scopes("auth|storage|contacts"),
            vec!["https://www.googleapis.com/auth/drive"]
        );
        assert!(populate_scopes("auth|contacts").is_empty());
        assert!(populate_scopes("").is_empty());
    }

    #[test]
    fn test_update_scopes() {
        let mut module = ModuleSettings::default();
        module.update_scopes(&[ScopeSetting {
            name: "storage".to_string(),
            description: String::new(),
            value: true,
        }]);
        assert_eq!(module.scopes, "storage");

        module.update_scopes(&[ScopeSetting {
            name: "storage".to_string(),
            description: String::new(),
            value: false,
        }]);
        assert_eq!(module.scopes, "");

        module.scopes = "storage".to_string();
        module.update_scopes(&[]);
        assert_eq!(module.scopes, "");
    }

    #[test]
    fn test_scope_settings_by_role() {
        let granted = ModuleSettings::with_storage();
        let not_granted = ModuleSettings::default();
        let linked = account("storage");

        let admin = scope_settings(UserRole::SuperAdmin, &granted, None);
        assert_eq!(admin.len(), 1);
        assert!(admin[0].value);

        let admin = scope_settings(UserRole::SuperAdmin, &not_granted, None);
        assert_eq!(admin.len(), 1);
        assert!(!admin[0].value);

        let user = scope_settings(UserRole::NormalUser, &granted, Some(&linked));
        assert_eq!(user.len(), 1);
        assert!(user[0].value);

        let user = scope_settings(UserRole::TenantAdmin, &granted, None);
        assert_eq!(user.len(), 1);
        assert!(!user[0].value);

        assert!(scope_settings(UserRole::NormalUser, &not_granted, Some(&linked)).is_empty());
        assert!(scope_settings(UserRole::Anonymous, &granted, Some(&linked)).is_empty());
    }

    #[test]
    fn test_check_enabled() {
        let provider = ProviderSettings::new("id", "secret");
        assert!(check_enabled(&provider, &ModuleSettings::with_storage()).is_ok());

        let mut disabled_provider = provider.clone();
        disabled_provider.enable_module = false;
        assert_eq!(
            check_enabled(&disabled_provider, &ModuleSettings::with_storage()),
            Err(UnavailableReason::ProviderDisabled)
        );

        let mut module = ModuleSettings::with_storage();
        module.disabled = true;
        assert_eq!(
            check_enabled(&provider, &module),
            Err(UnavailableReason::ModuleDisabled)
        );

        assert!(matches!(
            check_enabled(&provider, &ModuleSettings::default()),
            Err(UnavailableReason::ScopeNotGranted(_))
        ));
    }
}
