//! Tenant-scoped storage contexts for tenstore
//!
//! Resolves a logical, tenant-agnostic storage request ("the blob container
//! called `orders`") into a client pointed at that tenant's own physical
//! object, for blob, table, document, relational and graph stores.
//!
//! # Features
//!
//! - **Naming transform** - stable, store-legal physical names per tenant
//! - **Secret resolution** - vault secrets fetched once per credential
//! - **Single-flight connections** - one build per credential under load
//! - **Legacy migration** - one-way, idempotent schema upgrade that
//!   provisions resources before handing back the new record
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tenstore_storage::prelude::*;
//! use tenstore_tenancy::Tenant;
//!
//! struct Endpoints;
//!
//! #[async_trait::async_trait]
//! impl StoreClientFactory<Blob> for Endpoints {
//!     type Client = String;
//!
//!     fn create_client(&self, request: &ClientRequest<'_, Blob>) -> Result<String, ClientError> {
//!         Ok(request.endpoint.clone())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let factory = BlobContextFactory::new(
//!     Arc::new(Endpoints),
//!     SecretResolver::new(Arc::new(InMemorySecretVault::new())),
//!     LocalDevelopmentSettings::default(),
//! );
//!
//! let tenant = Tenant::new("root", "Root").with_raw_property(
//!     configuration_key("orders"),
//!     serde_json::json!({"ConnectionStringPlainText": "UseDevelopmentStorage=true"}),
//! );
//!
//! let endpoint = factory
//!     .resolve(&tenant, &StorageDefinition::new("orders"), None)
//!     .await
//!     .unwrap();
//! assert!(endpoint.starts_with("http://127.0.0.1:10000/devstoreaccount1/"));
//! # });
//! ```

pub mod configuration;
pub mod connection;
pub mod error;
pub mod factory;
pub mod migration;
pub mod naming;
pub mod secret;
pub mod settings;
pub mod stores;

pub use configuration::{
    CONFIGURATION_KEY_PREFIX, CredentialSource, StorageConfiguration, StorageDefinition,
    VaultSecretReference, configuration_key,
};
pub use connection::{ConnectionString, Credential, ResolvedConnection, Secret};
pub use error::{ClientError, Result, SecretError, StorageError};
pub use factory::{
    BlobContextFactory, CosmosContextFactory, GremlinContextFactory, SqlContextFactory,
    StorageContextFactory, TableContextFactory,
};
pub use migration::{
    LegacyBlobConfiguration, LegacyConfiguration, LegacyCosmosConfiguration,
    LegacyGremlinConfiguration, LegacyPublicAccessType, LegacySqlConfiguration,
    LegacyTableConfiguration, MigrationAdapter, MigrationKeys, MigrationOutcome,
    from_legacy_to_current,
};
pub use naming::{NamingPolicy, hash_and_encode, physical_name, tenanted_name};
pub use secret::{InMemorySecretVault, SecretResolver, SecretVault};
pub use settings::LocalDevelopmentSettings;
pub use stores::{
    Blob, BlobOptions, ClientRequest, Cosmos, CosmosOptions, Gremlin, GremlinOptions,
    PublicAccessType, Sql, SqlOptions, StoreClientFactory, StoreKind, Table, TableOptions,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::configuration::{StorageConfiguration, StorageDefinition, configuration_key};
    pub use crate::error::{ClientError, StorageError};
    pub use crate::factory::{
        BlobContextFactory, CosmosContextFactory, GremlinContextFactory, SqlContextFactory,
        StorageContextFactory, TableContextFactory,
    };
    pub use crate::migration::{MigrationAdapter, MigrationKeys, MigrationOutcome};
    pub use crate::secret::{InMemorySecretVault, SecretResolver, SecretVault};
    pub use crate::settings::LocalDevelopmentSettings;
    pub use crate::stores::{
        Blob, ClientRequest, Cosmos, Gremlin, Sql, StoreClientFactory, StoreKind, Table,
    };
}
