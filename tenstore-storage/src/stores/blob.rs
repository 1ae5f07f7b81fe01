//! Blob containers.

use super::{StoreKind, storage_account_endpoint};
use crate::connection::ResolvedConnection;
use crate::error::Result;
use crate::naming::NamingPolicy;
use crate::settings::LocalDevelopmentSettings;
use serde::{Deserialize, Serialize};

/// Blob emulator port.
pub const EMULATOR_PORT: u16 = 10000;

/// Blob container store.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blob;

/// Anonymous read access level of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicAccessType {
    /// Private
    #[default]
    None,
    /// Container and blob metadata readable
    BlobContainer,
    /// Blobs readable
    Blob,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlobOptions {
    /// Access level applied when the container is created
    #[serde(
        rename = "PublicAccessType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub access_type: Option<PublicAccessType>,
}

impl StoreKind for Blob {
    type Options = BlobOptions;

    const NAME: &'static str = "blob";
    const NAMING: NamingPolicy = NamingPolicy::Hashed;
    const LEGACY_FIELDS: &'static [&'static str] = &[
        "Container",
        "KeyVaultName",
        "AccountKeySecretName",
        "AccessType",
        "DisableTenantIdPrefix",
    ];
    const LEGACY_INLINE_ACCOUNT: bool = true;

    fn local_connection(settings: &LocalDevelopmentSettings) -> ResolvedConnection {
        ResolvedConnection::local(settings.storage_connection_string.clone())
    }

    fn endpoint(
        connection: &ResolvedConnection,
        physical_name: &str,
        _options: &BlobOptions,
    ) -> Result<String> {
        storage_account_endpoint(Self::NAME, connection, "blob", EMULATOR_PORT, physical_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_endpoint() {
        let connection = Blob::local_connection(&LocalDevelopmentSettings::default());
        let endpoint = Blob::endpoint(&connection, "abc", &BlobOptions::default()).unwrap();
        assert_eq!(endpoint, "http://127.0.0.1:10000/devstoreaccount1/abc");
    }

    #[test]
    fn test_access_key_endpoint() {
        let connection = ResolvedConnection::access_key("acct", "a2V5");
        let endpoint = Blob::endpoint(&connection, "abc", &BlobOptions::default()).unwrap();
        assert_eq!(endpoint, "https://acct.blob.core.windows.net/abc");
    }

    #[test]
    fn test_options_shape() {
        let options = BlobOptions {
            access_type: Some(PublicAccessType::BlobContainer),
        };
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            serde_json::json!({"PublicAccessType": "BlobContainer"})
        );
    }
}
