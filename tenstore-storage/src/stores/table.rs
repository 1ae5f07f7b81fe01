//! Tables.

use super::{StoreKind, storage_account_endpoint};
use crate::connection::ResolvedConnection;
use crate::error::Result;
use crate::naming::NamingPolicy;
use crate::settings::LocalDevelopmentSettings;
use serde::{Deserialize, Serialize};

/// Table emulator port.
pub const EMULATOR_PORT: u16 = 10002;

/// Table store.
#[derive(Debug, Clone, Copy, Default)]
pub struct Table;

/// Tables carry no extras.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {}

impl StoreKind for Table {
    type Options = TableOptions;

    const NAME: &'static str = "table";
    const NAMING: NamingPolicy = NamingPolicy::HashedTable;
    const LEGACY_FIELDS: &'static [&'static str] = &[
        "TableName",
        "KeyVaultName",
        "AccountKeySecretName",
        "DisableTenantIdPrefix",
    ];
    const LEGACY_INLINE_ACCOUNT: bool = true;

    fn local_connection(settings: &LocalDevelopmentSettings) -> ResolvedConnection {
        ResolvedConnection::local(settings.storage_connection_string.clone())
    }

    fn endpoint(
        connection: &ResolvedConnection,
        physical_name: &str,
        _options: &TableOptions,
    ) -> Result<String> {
        storage_account_endpoint(Self::NAME, connection, "table", EMULATOR_PORT, physical_name)
    }
}
