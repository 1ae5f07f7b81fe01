//! Backing-store kinds.
//!
//! Each kind fixes its naming policy, its emulator defaults, how a base
//! credential and a physical name compose into an endpoint, and which
//! payload fields mark a legacy record. Client construction itself is the
//! job of a [`StoreClientFactory`] supplied by the application.

pub mod blob;
pub mod cosmos;
pub mod gremlin;
pub mod sql;
pub mod table;

pub use blob::{Blob, BlobOptions, PublicAccessType};
pub use cosmos::{Cosmos, CosmosOptions};
pub use gremlin::{Gremlin, GremlinOptions};
pub use sql::{Sql, SqlOptions};
pub use table::{Table, TableOptions};

use crate::configuration::is_legacy_payload;
use crate::connection::{ConnectionString, ResolvedConnection};
use crate::error::{ClientError, Result, StorageError};
use crate::naming::NamingPolicy;
use crate::settings::LocalDevelopmentSettings;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;

/// Emulator account shared by the blob and table emulators.
pub const DEV_STORE_ACCOUNT: &str = "devstoreaccount1";

/// A kind of backing store.
pub trait StoreKind: Send + Sync + 'static {
    /// Store-specific configuration extras.
    type Options: Debug + Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Short name used in errors and logs.
    const NAME: &'static str;

    const NAMING: NamingPolicy;

    /// Fields only the legacy schema defines.
    const LEGACY_FIELDS: &'static [&'static str];

    /// Legacy records of this kind may hold a connection string in
    /// `AccountName`.
    const LEGACY_INLINE_ACCOUNT: bool = false;

    /// Connection used when a configuration names no credential.
    fn local_connection(settings: &LocalDevelopmentSettings) -> ResolvedConnection;

    /// Whether a stored payload is a legacy record of this kind.
    fn is_legacy_payload(value: &Value) -> bool {
        is_legacy_payload(value, Self::LEGACY_FIELDS, Self::LEGACY_INLINE_ACCOUNT)
    }

    /// Address of `physical_name` reached through `connection`.
    fn endpoint(
        connection: &ResolvedConnection,
        physical_name: &str,
        options: &Self::Options,
    ) -> Result<String>;
}

/// Everything a client factory needs to build one client.
///
/// `Debug` leaves out the endpoint, which for relational stores is a full
/// connection string.
pub struct ClientRequest<'a, K: StoreKind> {
    /// Shared base credential
    pub connection: &'a ResolvedConnection,
    /// Tenant-specific object name
    pub physical_name: String,
    pub options: &'a K::Options,
    /// Composed address of the object
    pub endpoint: String,
}

impl<K: StoreKind> Debug for ClientRequest<'_, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRequest")
            .field("store", &K::NAME)
            .field("connection", self.connection)
            .field("physical_name", &self.physical_name)
            .field("options", self.options)
            .finish_non_exhaustive()
    }
}

/// Builds concrete clients (implement with your store SDK).
#[async_trait]
pub trait StoreClientFactory<K: StoreKind>: Send + Sync + 'static {
    type Client: Send;

    /// Build a client. Must not perform I/O beyond what the SDK does lazily.
    fn create_client(
        &self,
        request: &ClientRequest<'_, K>,
    ) -> std::result::Result<Self::Client, ClientError>;

    /// Create the physical object if absent; `true` if it was created.
    ///
    /// Stores provisioned out of band keep the default.
    async fn create_if_not_exists(
        &self,
        _request: &ClientRequest<'_, K>,
    ) -> std::result::Result<bool, ClientError> {
        Ok(false)
    }
}

/// Endpoint of an object in a blob or table service.
pub(crate) fn storage_account_endpoint(
    store: &'static str,
    connection: &ResolvedConnection,
    service: &str,
    emulator_port: u16,
    physical_name: &str,
) -> Result<String> {
    let parsed = connection.connection_string_value();
    let development = match &parsed {
        Some(parsed) => parsed.is_development_storage(),
        None => connection.local_development,
    };
    if development {
        return Ok(format!(
            "http://127.0.0.1:{}/{}/{}",
            emulator_port, DEV_STORE_ACCOUNT, physical_name
        ));
    }

    let parsed = parsed.unwrap_or_default();
    let explicit_key = format!("{}Endpoint", capitalize(service));
    if let Some(base) = parsed.get(&explicit_key) {
        return Ok(join_path(base, physical_name));
    }

    let account = connection
        .account_name
        .as_deref()
        .ok_or_else(|| {
            StorageError::invalid(
                store,
                format!("the connection names neither AccountName nor {}", explicit_key),
                vec![],
            )
        })?;

    if account.contains("://") {
        return Ok(join_path(account, physical_name));
    }

    Ok(format!(
        "{}://{}.{}.{}/{}",
        parsed.protocol(),
        account,
        service,
        parsed.endpoint_suffix(),
        physical_name
    ))
}

/// Value of the first of `keys` present in the connection string.
pub(crate) fn first_of<'a>(parsed: &'a ConnectionString, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| parsed.get(key))
}

pub(crate) fn join_path(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
