//! Relational databases.

use super::StoreKind;
use crate::connection::{ConnectionString, Credential, ResolvedConnection};
use crate::error::{Result, StorageError};
use crate::naming::NamingPolicy;
use crate::settings::LocalDevelopmentSettings;
use serde::{Deserialize, Serialize};

/// Relational database store.
///
/// The "endpoint" is the connection string with the tenant's database
/// selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sql;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SqlOptions {
    /// Local server: integrated security instead of directory auth
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_local_database: bool,
}

impl StoreKind for Sql {
    type Options = SqlOptions;

    const NAME: &'static str = "sql";
    const NAMING: NamingPolicy = NamingPolicy::TenantScoped;
    const LEGACY_FIELDS: &'static [&'static str] = &[
        "ConnectionString",
        "Database",
        "KeyVaultName",
        "ConnectionStringSecretName",
        "DisableTenantIdPrefix",
    ];

    fn local_connection(settings: &LocalDevelopmentSettings) -> ResolvedConnection {
        ResolvedConnection::local(settings.sql_connection_string.clone())
    }

    fn endpoint(
        connection: &ResolvedConnection,
        physical_name: &str,
        options: &SqlOptions,
    ) -> Result<String> {
        if physical_name.contains(|c: char| c == ';' || c == '=') {
            return Err(StorageError::invalid(
                Self::NAME,
                format!(
                    "database name '{}' contains connection string syntax (';' or '=')",
                    physical_name
                ),
                vec![],
            ));
        }

        let base = match &connection.credential {
            Credential::ConnectionString(secret) => ConnectionString::parse(secret.expose()),
            Credential::AmbientIdentity => {
                let server = connection.account_name.as_deref().unwrap_or_default();
                let base = ConnectionString::default().with("Server", server);
                if options.is_local_database {
                    base.with("Trusted_Connection", "True")
                } else {
                    base.with("Authentication", "Active Directory Default")
                }
            }
            Credential::AccessKey(_) => {
                return Err(StorageError::invalid(
                    Self::NAME,
                    "relational stores take a connection string, not an account key",
                    vec!["AccountName", "SecretInKeyVault.SecretName"],
                ));
            }
        };

        Ok(base.with("Database", physical_name).to_string())
    }
}
