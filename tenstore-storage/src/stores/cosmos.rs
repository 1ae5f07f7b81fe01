//! Document database containers.

use super::StoreKind;
use crate::connection::ResolvedConnection;
use crate::error::{Result, StorageError};
use crate::naming::NamingPolicy;
use crate::settings::LocalDevelopmentSettings;
use serde::{Deserialize, Serialize};
use url::Url;

/// Document database store.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cosmos;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CosmosOptions {
    /// Database holding the container (required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    /// Partition key path, e.g. `/id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key_path: Option<String>,
    /// Provisioned throughput applied on creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput: Option<u32>,
}

impl StoreKind for Cosmos {
    type Options = CosmosOptions;

    const NAME: &'static str = "cosmos";
    const NAMING: NamingPolicy = NamingPolicy::Hashed;
    const LEGACY_FIELDS: &'static [&'static str] = &[
        "AccountUri",
        "ContainerName",
        "KeyVaultName",
        "AccountKeySecretName",
        "DisableTenantIdPrefix",
    ];

    fn local_connection(settings: &LocalDevelopmentSettings) -> ResolvedConnection {
        ResolvedConnection::local(settings.cosmos_connection_string.clone())
    }

    /// `{account endpoint}dbs/{database}/colls/{container}`
    fn endpoint(
        connection: &ResolvedConnection,
        physical_name: &str,
        options: &CosmosOptions,
    ) -> Result<String> {
        let database = options
            .database_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                StorageError::invalid(Self::NAME, "DatabaseName is required", vec![])
            })?;

        let account = connection
            .connection_string_value()
            .and_then(|parsed| parsed.get("AccountEndpoint").map(str::to_string))
            .or_else(|| connection.account_name.clone())
            .ok_or_else(|| {
                StorageError::invalid(
                    Self::NAME,
                    "the connection names no account endpoint",
                    vec![],
                )
            })?;

        let mut base = Url::parse(&account).map_err(|e| {
            StorageError::invalid(
                Self::NAME,
                format!("account endpoint '{}' is not a URL: {}", account, e),
                vec!["AccountName"],
            )
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let endpoint = base
            .join(&format!("dbs/{}/colls/{}", database, physical_name))
            .map_err(|e| StorageError::invalid(Self::NAME, e.to_string(), vec![]))?;
        Ok(endpoint.to_string())
    }
}
