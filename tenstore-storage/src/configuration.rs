//! Storage configuration records.
//!
//! A [`StorageConfiguration`] describes how to reach one backing-store
//! instance. It is stored serialized in the tenant property bag under
//! [`configuration_key`] and read back at resolution time. Records are
//! immutable; the `with_*` builders return new values.

use crate::error::{Result, StorageError};
use crate::naming::hash_and_encode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of the tenant property key holding a configuration record.
pub const CONFIGURATION_KEY_PREFIX: &str = "StorageConfiguration__";

/// Tenant property key for the configuration of `logical_name`.
///
/// ```
/// use tenstore_storage::configuration::configuration_key;
///
/// assert_eq!(configuration_key("orders"), "StorageConfiguration__orders");
/// ```
pub fn configuration_key(logical_name: &str) -> String {
    format!("{}{}", CONFIGURATION_KEY_PREFIX, logical_name)
}

/// A secret held in a vault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VaultSecretReference {
    /// Vault name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_name: Option<String>,
    /// Secret name within the vault
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

impl VaultSecretReference {
    /// Reference with both halves set.
    pub fn new(vault_name: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self {
            vault_name: Some(vault_name.into()),
            secret_name: Some(secret_name.into()),
        }
    }
}

/// Current-schema configuration for one store kind.
///
/// `O` carries the store-specific extras and is flattened into the same
/// record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageConfiguration<O> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    connection_string_plain_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret_in_key_vault: Option<VaultSecretReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    object_name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    disable_tenant_prefix: bool,
    #[serde(flatten)]
    options: O,
}

impl<O: Default> StorageConfiguration<O> {
    /// Empty configuration: resolves to the local development default.
    pub fn new() -> Self {
        Self {
            account_name: None,
            connection_string_plain_text: None,
            secret_in_key_vault: None,
            object_name: None,
            disable_tenant_prefix: false,
            options: O::default(),
        }
    }
}

impl<O> StorageConfiguration<O> {
    /// Account name, account endpoint or host, depending on the store.
    pub fn account_name(&self) -> Option<&str> {
        non_empty(&self.account_name)
    }

    /// Inline connection string or key.
    pub fn connection_string_plain_text(&self) -> Option<&str> {
        non_empty(&self.connection_string_plain_text)
    }

    /// Vault reference, as stored.
    pub fn secret_in_key_vault(&self) -> Option<&VaultSecretReference> {
        self.secret_in_key_vault.as_ref()
    }

    /// Physical object name, as stored.
    pub fn object_name(&self) -> Option<&str> {
        non_empty(&self.object_name)
    }

    pub fn disable_tenant_prefix(&self) -> bool {
        self.disable_tenant_prefix
    }

    /// Store-specific options.
    pub fn options(&self) -> &O {
        &self.options
    }

    pub fn with_account_name(self, account_name: impl Into<String>) -> Self {
        Self {
            account_name: Some(account_name.into()),
            ..self
        }
    }

    pub fn with_connection_string(self, connection_string: impl Into<String>) -> Self {
        Self {
            connection_string_plain_text: Some(connection_string.into()),
            ..self
        }
    }

    pub fn with_vault_secret(self, reference: VaultSecretReference) -> Self {
        Self {
            secret_in_key_vault: Some(reference),
            ..self
        }
    }

    pub fn with_object_name(self, object_name: impl Into<String>) -> Self {
        Self {
            object_name: Some(object_name.into()),
            ..self
        }
    }

    /// Same record with no stored object name.
    pub fn without_object_name(self) -> Self {
        Self {
            object_name: None,
            ..self
        }
    }

    pub fn with_disable_tenant_prefix(self, disable: bool) -> Self {
        Self {
            disable_tenant_prefix: disable,
            ..self
        }
    }

    pub fn with_options(self, options: O) -> Self {
        Self { options, ..self }
    }

    /// No credential field is set.
    pub fn is_empty(&self) -> bool {
        self.set_fields().is_empty()
    }

    /// Names of the credential fields that are set.
    pub fn set_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.account_name().is_some() {
            fields.push("AccountName");
        }
        if self.connection_string_plain_text().is_some() {
            fields.push("ConnectionStringPlainText");
        }
        if let Some(reference) = &self.secret_in_key_vault {
            if non_empty(&reference.vault_name).is_some() {
                fields.push("SecretInKeyVault.VaultName");
            }
            if non_empty(&reference.secret_name).is_some() {
                fields.push("SecretInKeyVault.SecretName");
            }
        }
        fields
    }

    /// Classify the credential fields, enforcing that an inline secret, a
    /// complete vault reference, or neither is present.
    pub fn validate(&self, store: &'static str) -> Result<CredentialSource> {
        let account = self.account_name();
        let inline = self.connection_string_plain_text();
        let (vault_name, secret_name) = match &self.secret_in_key_vault {
            Some(reference) => (
                non_empty(&reference.vault_name),
                non_empty(&reference.secret_name),
            ),
            None => (None, None),
        };

        let fields = self.set_fields();
        match (inline, vault_name, secret_name) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(StorageError::invalid(
                store,
                "an inline connection string and a vault reference are mutually exclusive",
                fields,
            )),
            (Some(_), None, None) if account.is_some() => Err(StorageError::invalid(
                store,
                "AccountName and an inline connection string are mutually exclusive",
                fields,
            )),
            (Some(value), None, None) => {
                Ok(CredentialSource::InlineConnectionString(value.to_string()))
            }
            (None, Some(vault), Some(secret)) => Ok(CredentialSource::VaultSecret {
                account_name: account.map(str::to_string),
                vault_name: vault.to_string(),
                secret_name: secret.to_string(),
            }),
            (None, Some(_), None) | (None, None, Some(_)) => Err(StorageError::invalid(
                store,
                "a vault reference needs both VaultName and SecretName",
                fields,
            )),
            (None, None, None) => match account {
                Some(account) if looks_like_connection_string(account) => {
                    Err(StorageError::invalid(
                        store,
                        "AccountName holds a connection string; use ConnectionStringPlainText",
                        fields,
                    ))
                }
                Some(account) => Ok(CredentialSource::AmbientIdentity {
                    account_name: account.to_string(),
                }),
                None => Ok(CredentialSource::LocalDevelopment),
            },
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Where a configuration's credential comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Well-known emulator defaults.
    LocalDevelopment,
    /// Connection string stored in the record itself.
    InlineConnectionString(String),
    /// Secret fetched from a vault. With an account, the secret is that
    /// account's key; without one, it is a full connection string.
    VaultSecret {
        account_name: Option<String>,
        vault_name: String,
        secret_name: String,
    },
    /// Account only; the client authenticates with its own identity.
    AmbientIdentity { account_name: String },
}

impl CredentialSource {
    /// Cache identity of the credential.
    ///
    /// Derived from the secret identity only, never from the tenant or the
    /// object, so every object backed by one secret shares one resolution.
    /// Inline secrets are hashed so they never appear in keys or logs; other
    /// parts are percent-encoded so `/`, `@` and `:` inside them stay
    /// unambiguous.
    pub fn cache_key(&self) -> String {
        match self {
            CredentialSource::LocalDevelopment => "local".to_string(),
            CredentialSource::InlineConnectionString(value) => {
                format!("inline:{}", hash_and_encode(value))
            }
            CredentialSource::VaultSecret {
                account_name,
                vault_name,
                secret_name,
            } => format!(
                "vault:{}/{}@{}",
                key_part(vault_name),
                key_part(secret_name),
                key_part(account_name.as_deref().unwrap_or_default())
            ),
            CredentialSource::AmbientIdentity { account_name } => {
                format!("account:{}", key_part(account_name))
            }
        }
    }
}

/// Tenant-agnostic request for a storage object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageDefinition {
    /// Logical object name
    pub logical_name: String,
    /// Explicit property key, overriding [`configuration_key`]
    pub configuration_key: Option<String>,
}

impl StorageDefinition {
    pub fn new(logical_name: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            configuration_key: None,
        }
    }

    /// Read the configuration from an explicit property key.
    pub fn with_configuration_key(mut self, key: impl Into<String>) -> Self {
        self.configuration_key = Some(key.into());
        self
    }

    /// Tenant property key holding this definition's configuration.
    pub fn configuration_key(&self) -> String {
        self.configuration_key
            .clone()
            .unwrap_or_else(|| configuration_key(&self.logical_name))
    }
}

/// Fields that only the current schema defines.
pub const CURRENT_ONLY_FIELDS: &[&str] = &[
    "ConnectionStringPlainText",
    "SecretInKeyVault",
    "ObjectName",
    "DisableTenantPrefix",
];

/// Whether a stored payload has the legacy shape.
///
/// A payload is legacy if it holds any field that only the legacy schema
/// defines. With `inline_account`, a payload holding no current-only field
/// whose `AccountName` is a connection string is legacy too: the legacy
/// schema kept inline credentials in that field.
pub fn is_legacy_payload(value: &Value, markers: &[&str], inline_account: bool) -> bool {
    let Some(record) = value.as_object() else {
        return false;
    };
    if markers.iter().any(|marker| record.contains_key(*marker)) {
        return true;
    }

    inline_account
        && !CURRENT_ONLY_FIELDS
            .iter()
            .any(|field| record.contains_key(*field))
        && record
            .get("AccountName")
            .and_then(Value::as_str)
            .is_some_and(looks_like_connection_string)
}

/// `key=value` pairs never occur in account names, hosts or endpoints.
pub fn looks_like_connection_string(value: &str) -> bool {
    value.contains('=')
}

/// Escape one part of a cache key so parts cannot run into each other.
fn key_part(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Extras {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        throughput: Option<u32>,
    }

    type Config = StorageConfiguration<Extras>;

    #[test]
    fn test_empty_is_local_development() {
        let config = Config::new();
        assert!(config.is_empty());
        assert_eq!(config.validate("blob").unwrap(), CredentialSource::LocalDevelopment);
    }

    #[test]
    fn test_empty_strings_count_as_absent() {
        let config = Config::new()
            .with_connection_string("")
            .with_account_name("  ");
        assert_eq!(config.validate("blob").unwrap(), CredentialSource::LocalDevelopment);
    }

    #[test]
    fn test_inline_and_vault_is_invalid() {
        let config = Config::new()
            .with_connection_string("UseDevelopmentStorage=true")
            .with_vault_secret(VaultSecretReference::new("ops", "storage"));
        let err = config.validate("blob").unwrap_err();
        match err {
            StorageError::ConfigurationInvalid { fields, .. } => {
                assert_eq!(
                    fields,
                    vec![
                        "ConnectionStringPlainText",
                        "SecretInKeyVault.VaultName",
                        "SecretInKeyVault.SecretName"
                    ]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_vault_name_only_is_invalid() {
        let config = Config::new().with_vault_secret(VaultSecretReference {
            vault_name: Some("ops".to_string()),
            secret_name: None,
        });
        assert!(matches!(
            config.validate("blob"),
            Err(StorageError::ConfigurationInvalid { .. })
        ));
    }

    #[test]
    fn test_account_with_inline_is_invalid() {
        let config = Config::new()
            .with_account_name("acct")
            .with_connection_string("AccountName=acct;AccountKey=a2V5");
        assert!(config.validate("blob").unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_account_only_is_ambient_identity() {
        let config = Config::new().with_account_name("acct");
        assert_eq!(
            config.validate("blob").unwrap(),
            CredentialSource::AmbientIdentity {
                account_name: "acct".to_string()
            }
        );
    }

    #[test]
    fn test_cache_key_ignores_object() {
        let reference = VaultSecretReference::new("ops", "storage");
        let orders = Config::new()
            .with_vault_secret(reference.clone())
            .with_object_name("orders");
        let invoices = Config::new()
            .with_vault_secret(reference)
            .with_object_name("invoices");

        assert_eq!(
            orders.validate("blob").unwrap().cache_key(),
            invoices.validate("blob").unwrap().cache_key()
        );
    }

    #[test]
    fn test_cache_key_hides_inline_secret() {
        let source = CredentialSource::InlineConnectionString("AccountKey=c2VjcmV0".to_string());
        let key = source.cache_key();
        assert!(key.starts_with("inline:"));
        assert!(!key.contains("c2VjcmV0"));
        assert_ne!(
            key,
            CredentialSource::InlineConnectionString("AccountKey=b3RoZXI=".to_string()).cache_key()
        );
    }

    #[test]
    fn test_serialized_shape() {
        let config = Config::new()
            .with_vault_secret(VaultSecretReference::new("ops", "storage"))
            .with_object_name("orders")
            .with_options(Extras {
                throughput: Some(400),
            });

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(
            value,
            json!({
                "SecretInKeyVault": {"VaultName": "ops", "SecretName": "storage"},
                "ObjectName": "orders",
                "Throughput": 400
            })
        );

        let back: Config = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_with_returns_new_value() {
        let base = Config::new().with_account_name("acct");
        let named = base.clone().with_object_name("orders");
        assert_eq!(base.object_name(), None);
        assert_eq!(named.object_name(), Some("orders"));
        assert_eq!(named.without_object_name(), base);
    }

    #[test]
    fn test_definition_key() {
        assert_eq!(
            StorageDefinition::new("orders").configuration_key(),
            "StorageConfiguration__orders"
        );
        assert_eq!(
            StorageDefinition::new("orders")
                .with_configuration_key("Custom")
                .configuration_key(),
            "Custom"
        );
    }

    #[test]
    fn test_legacy_payload_detection() {
        let markers = ["Container", "KeyVaultName"];
        assert!(is_legacy_payload(&json!({"AccountName": "a", "Container": "c"}), &markers, false));
        assert!(!is_legacy_payload(&json!({"AccountName": "a"}), &markers, true));
        assert!(!is_legacy_payload(&json!("text"), &markers, true));
    }

    #[test]
    fn test_inline_account_payload_is_legacy() {
        let markers = ["Container"];
        let inline = json!({"AccountName": "AccountName=acct;AccountKey=a2V5"});
        assert!(is_legacy_payload(&inline, &markers, true));
        assert!(!is_legacy_payload(&inline, &markers, false));

        let current = json!({
            "AccountName": "AccountName=acct;AccountKey=a2V5",
            "ObjectName": "abc"
        });
        assert!(!is_legacy_payload(&current, &markers, true));
    }

    #[test]
    fn test_connection_string_account_is_invalid() {
        let config = Config::new().with_account_name("AccountName=acct;AccountKey=c2VjcmV0");
        let err = config.validate("blob").unwrap_err();
        assert!(err.is_configuration_error());
        assert!(!err.to_string().contains("c2VjcmV0"));
    }

    #[test]
    fn test_vault_cache_key_is_unambiguous() {
        let key = |vault: &str, secret: &str| {
            CredentialSource::VaultSecret {
                account_name: None,
                vault_name: vault.to_string(),
                secret_name: secret.to_string(),
            }
            .cache_key()
        };
        assert_ne!(key("a/b", "c"), key("a", "b/c"));
        assert_eq!(key("ops", "storage"), "vault:ops/storage@");
    }
}
