//! Legacy configuration schema.
//!
//! Legacy records carry a raw object name and a vault name plus secret name
//! as separate flat fields. Without a vault name, the account field holds
//! the credential itself.

use crate::configuration::{StorageConfiguration, VaultSecretReference};
use crate::stores::{
    Blob, BlobOptions, Cosmos, CosmosOptions, Gremlin, GremlinOptions, PublicAccessType, Sql,
    SqlOptions, StoreKind, Table, TableOptions,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// A legacy record convertible to the current schema of its store kind.
pub trait LegacyConfiguration: DeserializeOwned + Serialize + Clone + Send + Sync + 'static {
    type Kind: StoreKind;

    /// Field-for-field conversion. The object name is left unset; see
    /// [`from_legacy_to_current`].
    fn to_current(&self) -> StorageConfiguration<<Self::Kind as StoreKind>::Options>;

    /// Logical object name, if the record names one.
    fn object_name(&self) -> Option<&str>;

    fn disable_tenant_prefix(&self) -> bool;
}

/// Convert a legacy record for `tenant_id`, baking in the physical name of
/// the object it names.
pub fn from_legacy_to_current<L: LegacyConfiguration>(
    legacy: &L,
    tenant_id: &str,
) -> StorageConfiguration<<L::Kind as StoreKind>::Options> {
    let current = legacy.to_current();
    match legacy.object_name() {
        Some(name) => current.with_object_name(<L::Kind as StoreKind>::NAMING.apply(
            tenant_id,
            name,
            legacy.disable_tenant_prefix(),
        )),
        None => current,
    }
}

/// Credential fields shared by the conversions.
///
/// With a vault name the account stays an account and the secret lives in
/// the vault. Without one, `fallback` decides what the account field means.
fn credentials<O>(
    current: StorageConfiguration<O>,
    account: Option<&str>,
    vault_name: Option<&str>,
    secret_name: Option<&str>,
    fallback: AccountMeaning,
) -> StorageConfiguration<O> {
    let account = account.filter(|v| !v.is_empty());
    match vault_name.filter(|v| !v.is_empty()) {
        Some(vault) => {
            let current = current.with_vault_secret(VaultSecretReference {
                vault_name: Some(vault.to_string()),
                secret_name: secret_name.map(str::to_string),
            });
            match account {
                Some(account) => current.with_account_name(account),
                None => current,
            }
        }
        None => match (account, fallback) {
            (Some(value), AccountMeaning::ConnectionString) => current.with_connection_string(value),
            (Some(value), AccountMeaning::Endpoint) => current.with_account_name(value),
            (None, _) => current,
        },
    }
}

#[derive(Clone, Copy)]
enum AccountMeaning {
    ConnectionString,
    Endpoint,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Legacy container access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LegacyPublicAccessType {
    Off,
    Container,
    Blob,
    /// Any value this schema version does not know
    Unknown,
}

impl LegacyPublicAccessType {
    /// Current-schema access level. Unknown values map to the most
    /// restrictive level.
    pub fn to_current(self) -> PublicAccessType {
        match self {
            LegacyPublicAccessType::Off => PublicAccessType::None,
            LegacyPublicAccessType::Container => PublicAccessType::BlobContainer,
            LegacyPublicAccessType::Blob => PublicAccessType::Blob,
            LegacyPublicAccessType::Unknown => PublicAccessType::None,
        }
    }
}

// Legacy records were written both as names and as numeric codes.
impl<'de> Deserialize<'de> for LegacyPublicAccessType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(i64),
            Name(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Code(0) => LegacyPublicAccessType::Off,
            Raw::Code(1) => LegacyPublicAccessType::Container,
            Raw::Code(2) => LegacyPublicAccessType::Blob,
            Raw::Code(_) => LegacyPublicAccessType::Unknown,
            Raw::Name(name) => match name.to_ascii_lowercase().as_str() {
                "off" => LegacyPublicAccessType::Off,
                "container" => LegacyPublicAccessType::Container,
                "blob" => LegacyPublicAccessType::Blob,
                _ => LegacyPublicAccessType::Unknown,
            },
        })
    }
}

/// Legacy blob container record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LegacyBlobConfiguration {
    /// Account name, or a connection string when no vault is named
    pub account_name: Option<String>,
    pub key_vault_name: Option<String>,
    pub account_key_secret_name: Option<String>,
    pub container: Option<String>,
    pub access_type: Option<LegacyPublicAccessType>,
    pub disable_tenant_id_prefix: bool,
}

impl LegacyConfiguration for LegacyBlobConfiguration {
    type Kind = Blob;

    fn to_current(&self) -> StorageConfiguration<BlobOptions> {
        let current = StorageConfiguration::new()
            .with_disable_tenant_prefix(self.disable_tenant_id_prefix)
            .with_options(BlobOptions {
                access_type: self.access_type.map(LegacyPublicAccessType::to_current),
            });
        credentials(
            current,
            non_empty(&self.account_name),
            non_empty(&self.key_vault_name),
            non_empty(&self.account_key_secret_name),
            AccountMeaning::ConnectionString,
        )
    }

    fn object_name(&self) -> Option<&str> {
        non_empty(&self.container)
    }

    fn disable_tenant_prefix(&self) -> bool {
        self.disable_tenant_id_prefix
    }
}

/// Legacy table record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LegacyTableConfiguration {
    pub account_name: Option<String>,
    pub key_vault_name: Option<String>,
    pub account_key_secret_name: Option<String>,
    pub table_name: Option<String>,
    pub disable_tenant_id_prefix: bool,
}

impl LegacyConfiguration for LegacyTableConfiguration {
    type Kind = Table;

    fn to_current(&self) -> StorageConfiguration<TableOptions> {
        let current = StorageConfiguration::new()
            .with_disable_tenant_prefix(self.disable_tenant_id_prefix);
        credentials(
            current,
            non_empty(&self.account_name),
            non_empty(&self.key_vault_name),
            non_empty(&self.account_key_secret_name),
            AccountMeaning::ConnectionString,
        )
    }

    fn object_name(&self) -> Option<&str> {
        non_empty(&self.table_name)
    }

    fn disable_tenant_prefix(&self) -> bool {
        self.disable_tenant_id_prefix
    }
}

/// Legacy document database record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LegacyCosmosConfiguration {
    /// Account endpoint
    pub account_uri: Option<String>,
    pub key_vault_name: Option<String>,
    pub account_key_secret_name: Option<String>,
    pub database_name: Option<String>,
    pub container_name: Option<String>,
    pub partition_key_path: Option<String>,
    pub throughput: Option<u32>,
    pub disable_tenant_id_prefix: bool,
}

impl LegacyConfiguration for LegacyCosmosConfiguration {
    type Kind = Cosmos;

    fn to_current(&self) -> StorageConfiguration<CosmosOptions> {
        let current = StorageConfiguration::new()
            .with_disable_tenant_prefix(self.disable_tenant_id_prefix)
            .with_options(CosmosOptions {
                database_name: self.database_name.clone(),
                partition_key_path: self.partition_key_path.clone(),
                throughput: self.throughput,
            });
        credentials(
            current,
            non_empty(&self.account_uri),
            non_empty(&self.key_vault_name),
            non_empty(&self.account_key_secret_name),
            AccountMeaning::Endpoint,
        )
    }

    fn object_name(&self) -> Option<&str> {
        non_empty(&self.container_name)
    }

    fn disable_tenant_prefix(&self) -> bool {
        self.disable_tenant_id_prefix
    }
}

/// Legacy relational database record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LegacySqlConfiguration {
    /// Connection string used when no vault is named
    pub connection_string: Option<String>,
    pub key_vault_name: Option<String>,
    /// Vault secret holding the whole connection string
    pub connection_string_secret_name: Option<String>,
    pub database: Option<String>,
    pub is_local_database: bool,
    pub disable_tenant_id_prefix: bool,
}

impl LegacyConfiguration for LegacySqlConfiguration {
    type Kind = Sql;

    fn to_current(&self) -> StorageConfiguration<SqlOptions> {
        let current = StorageConfiguration::new()
            .with_disable_tenant_prefix(self.disable_tenant_id_prefix)
            .with_options(SqlOptions {
                is_local_database: self.is_local_database,
            });
        match non_empty(&self.key_vault_name) {
            Some(vault) => current.with_vault_secret(VaultSecretReference {
                vault_name: Some(vault.to_string()),
                secret_name: self.connection_string_secret_name.clone(),
            }),
            None => match non_empty(&self.connection_string) {
                Some(value) => current.with_connection_string(value),
                None => current,
            },
        }
    }

    fn object_name(&self) -> Option<&str> {
        non_empty(&self.database)
    }

    fn disable_tenant_prefix(&self) -> bool {
        self.disable_tenant_id_prefix
    }
}

/// Legacy graph record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LegacyGremlinConfiguration {
    pub host_name: Option<String>,
    pub port: Option<u16>,
    pub key_vault_name: Option<String>,
    pub auth_key_secret_name: Option<String>,
    pub database_name: Option<String>,
    pub graph_name: Option<String>,
    pub disable_tenant_id_prefix: bool,
}

impl LegacyConfiguration for LegacyGremlinConfiguration {
    type Kind = Gremlin;

    fn to_current(&self) -> StorageConfiguration<GremlinOptions> {
        let current = StorageConfiguration::new()
            .with_disable_tenant_prefix(self.disable_tenant_id_prefix)
            .with_options(GremlinOptions {
                port: self.port,
                database_name: self.database_name.clone(),
            });
        credentials(
            current,
            non_empty(&self.host_name),
            non_empty(&self.key_vault_name),
            non_empty(&self.auth_key_secret_name),
            AccountMeaning::Endpoint,
        )
    }

    fn object_name(&self) -> Option<&str> {
        non_empty(&self.graph_name)
    }

    fn disable_tenant_prefix(&self) -> bool {
        self.disable_tenant_id_prefix
    }
}
