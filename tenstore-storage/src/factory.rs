//! Storage context factory.
//!
//! Turns a tenant and a tenant-agnostic [`StorageDefinition`] into a client
//! for the tenant's own physical object:
//!
//! 1. read the [`StorageConfiguration`] from the tenant's property bag
//! 2. validate its credential fields
//! 3. derive the physical name
//! 4. resolve the base connection through the context cache, keyed by
//!    credential identity so each secret is fetched once
//! 5. compose the endpoint and build the client (not cached)

use crate::configuration::{CredentialSource, StorageConfiguration, StorageDefinition};
use crate::connection::ResolvedConnection;
use crate::error::{Result, StorageError};
use crate::secret::SecretResolver;
use crate::settings::LocalDevelopmentSettings;
use crate::stores::{
    Blob, ClientRequest, Cosmos, Gremlin, Sql, StoreClientFactory, StoreKind, Table,
};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tenstore_cache::ContextCache;
use tenstore_tenancy::Tenant;
use tracing::{debug, info, warn};

/// Factory for blob container clients.
pub type BlobContextFactory<F> = StorageContextFactory<Blob, F>;
/// Factory for table clients.
pub type TableContextFactory<F> = StorageContextFactory<Table, F>;
/// Factory for document database container clients.
pub type CosmosContextFactory<F> = StorageContextFactory<Cosmos, F>;
/// Factory for relational database clients.
pub type SqlContextFactory<F> = StorageContextFactory<Sql, F>;
/// Factory for graph clients.
pub type GremlinContextFactory<F> = StorageContextFactory<Gremlin, F>;

/// Resolves tenant-scoped clients for one store kind.
///
/// All collaborators are supplied at construction. The only shared mutable
/// state is the connection cache.
pub struct StorageContextFactory<K: StoreKind, F: StoreClientFactory<K>> {
    clients: Arc<F>,
    secrets: SecretResolver,
    settings: LocalDevelopmentSettings,
    connections: ContextCache<ResolvedConnection, StorageError>,
    _kind: PhantomData<fn() -> K>,
}

impl<K, F> StorageContextFactory<K, F>
where
    K: StoreKind,
    F: StoreClientFactory<K>,
{
    /// Create a factory
    pub fn new(clients: Arc<F>, secrets: SecretResolver, settings: LocalDevelopmentSettings) -> Self {
        info!(store = K::NAME, "Storage context factory created");
        Self {
            clients,
            secrets,
            settings,
            connections: ContextCache::new(),
            _kind: PhantomData,
        }
    }

    /// Client factory in use
    pub fn clients(&self) -> &Arc<F> {
        &self.clients
    }

    pub fn settings(&self) -> &LocalDevelopmentSettings {
        &self.settings
    }

    /// Resolve a client for `definition` within `tenant`.
    ///
    /// `override_name` replaces the logical object name.
    pub async fn resolve(
        &self,
        tenant: &Tenant,
        definition: &StorageDefinition,
        override_name: Option<&str>,
    ) -> Result<F::Client> {
        let configuration = self.configuration(tenant, definition)?;
        self.client_for(tenant, &configuration, &definition.logical_name, override_name)
            .await
    }

    /// Current-schema configuration stored for `definition`.
    pub fn configuration(
        &self,
        tenant: &Tenant,
        definition: &StorageDefinition,
    ) -> Result<StorageConfiguration<K::Options>> {
        let key = definition.configuration_key();
        match tenant.raw_property(&key) {
            Some(value) if !value.is_null() => Self::parse_configuration(&key, value),
            _ => Err(StorageError::ConfigurationMissing {
                store: K::NAME,
                tenant_id: tenant.id.clone(),
                key,
            }),
        }
    }

    /// Parse a stored payload, refusing legacy-schema records.
    pub fn parse_configuration(key: &str, value: &Value) -> Result<StorageConfiguration<K::Options>> {
        if K::is_legacy_payload(value) {
            warn!(store = K::NAME, key = %key, "Legacy-schema configuration found at current key");
            return Err(StorageError::invalid(
                K::NAME,
                format!("'{}' holds a legacy-schema configuration; migrate it first", key),
                vec![],
            ));
        }

        serde_json::from_value(value.clone()).map_err(|e| {
            StorageError::invalid(
                K::NAME,
                format!("'{}' is not a {} configuration: {}", key, K::NAME, e),
                vec![],
            )
        })
    }

    /// Client for an already loaded configuration.
    pub async fn client_for(
        &self,
        tenant: &Tenant,
        configuration: &StorageConfiguration<K::Options>,
        logical_name: &str,
        override_name: Option<&str>,
    ) -> Result<F::Client> {
        configuration.validate(K::NAME)?;
        let physical_name =
            self.physical_name(tenant, configuration, logical_name, override_name)?;
        debug!(
            tenant_id = %tenant.id,
            store = K::NAME,
            logical = %logical_name,
            object = %physical_name,
            "Physical name derived"
        );
        self.client_with_name(configuration, physical_name).await
    }

    /// Client for an explicit physical name, skipping the naming transform.
    pub async fn client_with_name(
        &self,
        configuration: &StorageConfiguration<K::Options>,
        physical_name: String,
    ) -> Result<F::Client> {
        let connection = self.connection(configuration).await?;
        let request = Self::request(&connection, physical_name, configuration.options())?;

        debug!(
            store = K::NAME,
            object = %request.physical_name,
            local = connection.local_development,
            "Creating storage client"
        );

        self.clients
            .create_client(&request)
            .map_err(|source| StorageError::CreationFailed {
                store: K::NAME,
                object_name: request.physical_name.clone(),
                source,
            })
    }

    /// Physical object name for a resolution.
    ///
    /// An override or logical name goes through the naming transform. A name
    /// stored in the configuration is already physical (written that way by
    /// migration) and is used verbatim.
    pub fn physical_name(
        &self,
        tenant: &Tenant,
        configuration: &StorageConfiguration<K::Options>,
        logical_name: &str,
        override_name: Option<&str>,
    ) -> Result<String> {
        let disable = configuration.disable_tenant_prefix();

        if let Some(name) = override_name.filter(|name| !name.is_empty()) {
            return Ok(K::NAMING.apply(&tenant.id, name, disable));
        }
        if let Some(stored) = configuration.object_name() {
            return Ok(stored.to_string());
        }
        if !logical_name.is_empty() {
            return Ok(K::NAMING.apply(&tenant.id, logical_name, disable));
        }

        Err(StorageError::invalid(
            K::NAME,
            "no object name was configured or requested",
            configuration.set_fields(),
        ))
    }

    /// Base connection for `configuration`, built at most once per
    /// credential.
    pub async fn connection(
        &self,
        configuration: &StorageConfiguration<K::Options>,
    ) -> Result<ResolvedConnection> {
        let source = configuration.validate(K::NAME)?;
        let key = Self::key_for(&source);
        let secrets = self.secrets.clone();
        let settings = self.settings.clone();

        self.connections
            .get_or_create(&key, move || build_connection::<K>(source, secrets, settings))
            .await
    }

    /// Create the physical object if absent; `true` if it was created.
    pub async fn ensure_exists(
        &self,
        configuration: &StorageConfiguration<K::Options>,
        physical_name: &str,
    ) -> Result<bool> {
        let connection = self.connection(configuration).await?;
        let request =
            Self::request(&connection, physical_name.to_string(), configuration.options())?;

        let created = self
            .clients
            .create_if_not_exists(&request)
            .await
            .map_err(|source| StorageError::ResourceCreationFailed {
                store: K::NAME,
                object_name: physical_name.to_string(),
                source,
            })?;

        if created {
            info!(store = K::NAME, object = %physical_name, "Storage resource created");
        }
        Ok(created)
    }

    /// Connection cache key of `configuration`.
    pub fn cache_key(&self, configuration: &StorageConfiguration<K::Options>) -> Result<String> {
        Ok(Self::key_for(&configuration.validate(K::NAME)?))
    }

    /// Drop the cached connection, e.g. after a secret rotation.
    pub fn invalidate_connection(
        &self,
        configuration: &StorageConfiguration<K::Options>,
    ) -> Result<bool> {
        let key = self.cache_key(configuration)?;
        Ok(self.connections.invalidate(&key))
    }

    /// Number of cached connections
    pub fn cached_connections(&self) -> usize {
        self.connections.len()
    }

    fn key_for(source: &CredentialSource) -> String {
        format!("{}:{}", K::NAME, source.cache_key())
    }

    fn request<'a>(
        connection: &'a ResolvedConnection,
        physical_name: String,
        options: &'a K::Options,
    ) -> Result<ClientRequest<'a, K>> {
        let endpoint = K::endpoint(connection, &physical_name, options)?;
        Ok(ClientRequest {
            connection,
            physical_name,
            options,
            endpoint,
        })
    }
}

async fn build_connection<K: StoreKind>(
    source: CredentialSource,
    secrets: SecretResolver,
    settings: LocalDevelopmentSettings,
) -> Result<ResolvedConnection> {
    let connection = match source {
        CredentialSource::LocalDevelopment => {
            debug!(store = K::NAME, "No credential configured, using local development settings");
            K::local_connection(&settings)
        }
        CredentialSource::InlineConnectionString(value) => {
            ResolvedConnection::connection_string(value)
        }
        CredentialSource::VaultSecret {
            account_name,
            vault_name,
            secret_name,
        } => {
            let secret = secrets
                .resolve_secret(&vault_name, &secret_name)
                .await
                .map_err(|source| StorageError::SecretResolutionFailed {
                    store: K::NAME,
                    source,
                })?;
            match account_name {
                Some(account) => ResolvedConnection::access_key(account, secret.expose()),
                None => ResolvedConnection::connection_string(secret.expose()),
            }
        }
        CredentialSource::AmbientIdentity { account_name } => {
            ResolvedConnection::ambient(account_name)
        }
    };

    info!(
        store = K::NAME,
        account = ?connection.account_name,
        local = connection.local_development,
        "Storage connection resolved"
    );
    Ok(connection)
}

impl<K, F> std::fmt::Debug for StorageContextFactory<K, F>
where
    K: StoreKind,
    F: StoreClientFactory<K>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageContextFactory")
            .field("store", &K::NAME)
            .field("connections", &self.connections)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{VaultSecretReference, configuration_key};
    use crate::error::ClientError;
    use crate::naming::physical_name;
    use crate::secret::InMemorySecretVault;
    use crate::stores::BlobOptions;
    use async_trait::async_trait;
    use serde_json::json;

    #[derive(Debug, Default)]
    struct EndpointClients;

    #[async_trait]
    impl StoreClientFactory<Blob> for EndpointClients {
        type Client = String;

        fn create_client(
            &self,
            request: &ClientRequest<'_, Blob>,
        ) -> std::result::Result<String, ClientError> {
            Ok(request.endpoint.clone())
        }
    }

    #[derive(Debug, Default)]
    struct BrokenClients;

    #[async_trait]
    impl StoreClientFactory<Blob> for BrokenClients {
        type Client = String;

        fn create_client(
            &self,
            _request: &ClientRequest<'_, Blob>,
        ) -> std::result::Result<String, ClientError> {
            Err(ClientError::Construction("bad key".to_string()))
        }

        async fn create_if_not_exists(
            &self,
            _request: &ClientRequest<'_, Blob>,
        ) -> std::result::Result<bool, ClientError> {
            Err(ClientError::Provisioning("throttled".to_string()))
        }
    }

    fn factory<F: StoreClientFactory<Blob>>(
        clients: F,
        vault: Arc<InMemorySecretVault>,
    ) -> BlobContextFactory<F> {
        StorageContextFactory::new(
            Arc::new(clients),
            SecretResolver::new(vault),
            LocalDevelopmentSettings::default(),
        )
    }

    fn tenant(config: Value) -> Tenant {
        Tenant::new("root", "Root").with_raw_property(configuration_key("orders"), config)
    }

    #[tokio::test]
    async fn test_missing_configuration() {
        let factory = factory(EndpointClients, Arc::new(InMemorySecretVault::new()));
        let err = factory
            .resolve(&Tenant::new("root", "Root"), &StorageDefinition::new("orders"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::ConfigurationMissing { ref key, .. } if key == "StorageConfiguration__orders"
        ));
    }

    #[tokio::test]
    async fn test_empty_configuration_is_local() {
        let factory = factory(EndpointClients, Arc::new(InMemorySecretVault::new()));
        let endpoint = factory
            .resolve(&tenant(json!({})), &StorageDefinition::new("orders"), None)
            .await
            .unwrap();
        assert_eq!(
            endpoint,
            format!(
                "http://127.0.0.1:10000/devstoreaccount1/{}",
                physical_name("root", "orders", false)
            )
        );
    }

    #[tokio::test]
    async fn test_legacy_payload_rejected() {
        let factory = factory(EndpointClients, Arc::new(InMemorySecretVault::new()));
        let err = factory
            .resolve(
                &tenant(json!({"AccountName": "acct", "Container": "orders"})),
                &StorageDefinition::new("orders"),
                None,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("migrate it first"));
    }

    #[tokio::test]
    async fn test_physical_name_rules() {
        let factory = factory(EndpointClients, Arc::new(InMemorySecretVault::new()));
        let tenant = Tenant::new("Root/Child", "Child");
        let config = StorageConfiguration::<BlobOptions>::new();

        assert_eq!(
            factory.physical_name(&tenant, &config, "orders", None).unwrap(),
            physical_name("root/child", "orders", false)
        );
        assert_eq!(
            factory
                .physical_name(&tenant, &config, "orders", Some("invoices"))
                .unwrap(),
            physical_name("root/child", "invoices", false)
        );

        let stored = config.clone().with_object_name("abc123");
        assert_eq!(
            factory.physical_name(&tenant, &stored, "orders", None).unwrap(),
            "abc123"
        );

        assert!(factory.physical_name(&tenant, &config, "", None).is_err());
    }

    #[tokio::test]
    async fn test_secret_resolved_once_per_credential() {
        let vault = Arc::new(InMemorySecretVault::new().with_secret("ops", "storage", "a2V5"));
        let factory = factory(EndpointClients, vault.clone());
        let config = json!({
            "AccountName": "acct",
            "SecretInKeyVault": {"VaultName": "ops", "SecretName": "storage"}
        });
        let tenant = Tenant::new("root", "Root")
            .with_raw_property(configuration_key("orders"), config.clone())
            .with_raw_property(configuration_key("invoices"), config);

        let orders = factory
            .resolve(&tenant, &StorageDefinition::new("orders"), None)
            .await
            .unwrap();
        let invoices = factory
            .resolve(&tenant, &StorageDefinition::new("invoices"), None)
            .await
            .unwrap();

        assert_ne!(orders, invoices);
        assert!(orders.starts_with("https://acct.blob.core.windows.net/"));
        assert_eq!(vault.requests(), 1);
        assert_eq!(factory.cached_connections(), 1);
    }

    #[tokio::test]
    async fn test_secret_failure_is_not_cached() {
        let vault = Arc::new(InMemorySecretVault::new());
        let factory = factory(EndpointClients, vault.clone());
        let config = StorageConfiguration::<BlobOptions>::new()
            .with_vault_secret(VaultSecretReference::new("ops", "storage"));

        let err = factory.connection(&config).await.unwrap_err();
        assert!(matches!(err, StorageError::SecretResolutionFailed { .. }));

        vault.insert("ops", "storage", "UseDevelopmentStorage=true");
        let connection = factory.connection(&config).await.unwrap();
        assert!(connection.local_development);
        assert_eq!(vault.requests(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_connection_refetches() {
        let vault = Arc::new(InMemorySecretVault::new().with_secret("ops", "storage", "v1"));
        let factory = factory(EndpointClients, vault.clone());
        let config = StorageConfiguration::<BlobOptions>::new()
            .with_account_name("acct")
            .with_vault_secret(VaultSecretReference::new("ops", "storage"));

        factory.connection(&config).await.unwrap();
        assert!(factory.invalidate_connection(&config).unwrap());
        factory.connection(&config).await.unwrap();
        assert_eq!(vault.requests(), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_wrapped() {
        let factory = factory(BrokenClients, Arc::new(InMemorySecretVault::new()));
        let config = StorageConfiguration::<BlobOptions>::new();

        let err = factory
            .client_with_name(&config, "abc".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::CreationFailed { ref object_name, .. } if object_name == "abc"));

        let err = factory.ensure_exists(&config, "abc").await.unwrap_err();
        assert!(matches!(err, StorageError::ResourceCreationFailed { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_cache_key_per_store() {
        let factory = factory(EndpointClients, Arc::new(InMemorySecretVault::new()));
        let config = StorageConfiguration::<BlobOptions>::new();
        assert_eq!(factory.cache_key(&config).unwrap(), "blob:local");
    }
}
