//! Graph databases.

use super::{StoreKind, first_of};
use crate::connection::ResolvedConnection;
use crate::error::{Result, StorageError};
use crate::naming::NamingPolicy;
use crate::settings::LocalDevelopmentSettings;
use serde::{Deserialize, Serialize};

/// Port used when neither the options nor the connection name one.
pub const DEFAULT_PORT: u16 = 443;

/// Graph store.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gremlin;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GremlinOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Database holding the graph (required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
}

impl StoreKind for Gremlin {
    type Options = GremlinOptions;

    const NAME: &'static str = "gremlin";
    const NAMING: NamingPolicy = NamingPolicy::Hashed;
    const LEGACY_FIELDS: &'static [&'static str] = &[
        "HostName",
        "GraphName",
        "KeyVaultName",
        "AuthKeySecretName",
        "DisableTenantIdPrefix",
    ];

    fn local_connection(settings: &LocalDevelopmentSettings) -> ResolvedConnection {
        ResolvedConnection::local(format!(
            "HostName={};Port={};AuthKey={}",
            settings.gremlin_host, settings.gremlin_port, settings.gremlin_auth_key
        ))
    }

    /// `wss://{host}:{port}/dbs/{database}/colls/{graph}`
    fn endpoint(
        connection: &ResolvedConnection,
        physical_name: &str,
        options: &GremlinOptions,
    ) -> Result<String> {
        let database = options
            .database_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                StorageError::invalid(Self::NAME, "DatabaseName is required", vec![])
            })?;

        let parsed = connection.connection_string_value().unwrap_or_default();
        let host = first_of(&parsed, &["HostName", "Host"])
            .or(connection.account_name.as_deref())
            .ok_or_else(|| {
                StorageError::invalid(Self::NAME, "the connection names no host", vec![])
            })?;

        let port = match options.port {
            Some(port) => port,
            None => match parsed.get("Port") {
                Some(raw) => raw.parse().map_err(|_| {
                    StorageError::invalid(
                        Self::NAME,
                        format!("port '{}' is not a number", raw),
                        vec![],
                    )
                })?,
                None => DEFAULT_PORT,
            },
        };

        Ok(format!(
            "wss://{}:{}/dbs/{}/colls/{}",
            host, port, database, physical_name
        ))
    }
}
