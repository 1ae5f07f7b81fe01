//! End-to-end resolution through the facade crate.

use std::sync::Arc;
use tenstore::prelude::*;
use tenstore::{LegacyBlobConfiguration, physical_name};

#[derive(Debug)]
struct Endpoints;

#[async_trait]
impl StoreClientFactory<Blob> for Endpoints {
    type Client = String;

    fn create_client(&self, request: &ClientRequest<'_, Blob>) -> Result<String, ClientError> {
        Ok(request.endpoint.clone())
    }

    async fn create_if_not_exists(
        &self,
        _request: &ClientRequest<'_, Blob>,
    ) -> Result<bool, ClientError> {
        Ok(true)
    }
}

fn blob_factory() -> Arc<BlobContextFactory<Endpoints>> {
    Arc::new(BlobContextFactory::new(
        Arc::new(Endpoints),
        SecretResolver::new(Arc::new(InMemorySecretVault::new())),
        LocalDevelopmentSettings::default(),
    ))
}

#[tokio::test]
async fn test_development_storage_scenario() {
    let store = InMemoryTenantStore::new();
    let tenant = store
        .insert(Tenant::new("root", "Root").with_raw_property(
            configuration_key("orders"),
            serde_json::json!({"ConnectionStringPlainText": "UseDevelopmentStorage=true"}),
        ))
        .unwrap();

    let endpoint = blob_factory()
        .resolve(&tenant, &StorageDefinition::new("orders"), None)
        .await
        .unwrap();

    assert!(endpoint.starts_with("http://127.0.0.1:10000/devstoreaccount1/"));
}

#[tokio::test]
async fn test_child_tenant_migration_then_resolution() {
    let store = InMemoryTenantStore::new();
    store.insert(Tenant::new("root", "Root")).unwrap();
    let child = store.create_child_tenant("root", "Child").await.unwrap();

    let legacy = LegacyBlobConfiguration {
        account_name: Some("UseDevelopmentStorage=true".to_string()),
        container: Some("orders".to_string()),
        ..Default::default()
    };
    let keys = MigrationKeys::shared("orders");
    let child = store
        .update_tenant(
            &child,
            vec![(keys.legacy.clone(), serde_json::to_value(&legacy).unwrap())],
            vec![],
        )
        .await
        .unwrap();

    let adapter: MigrationAdapter<LegacyBlobConfiguration, Endpoints> =
        MigrationAdapter::new(blob_factory());
    let (migrated, outcome) = adapter
        .migrate_and_persist(&store, &child.id, &keys, &[])
        .await
        .unwrap();
    assert!(outcome.is_migrated());

    let endpoint = adapter
        .factory()
        .resolve(&migrated, &StorageDefinition::new("orders"), None)
        .await
        .unwrap();
    assert!(endpoint.ends_with(&physical_name(&child.id, "orders", false)));
}

#[test]
fn test_tracing_initializes_once() {
    let _ = tenstore::init_tracing_with_level("tenstore_storage=debug");
    assert!(!tenstore::init_tracing());
}
