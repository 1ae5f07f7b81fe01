//! Legacy migration adapter.
//!
//! Per tenant and object, configuration moves one way from the legacy
//! schema to the current one. Physical resources are provisioned before the
//! converted record is handed back, so a failure part way through leaves the
//! tenant on the legacy record.

use super::legacy::LegacyConfiguration;
use crate::configuration::{StorageConfiguration, StorageDefinition, configuration_key};
use crate::error::{Result, StorageError};
use crate::factory::StorageContextFactory;
use crate::stores::{StoreClientFactory, StoreKind};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tenstore_cache::ContextCache;
use tenstore_tenancy::{Tenant, TenantStore};
use tracing::{debug, info};

type Options<L> = <<L as LegacyConfiguration>::Kind as StoreKind>::Options;

/// Property keys of the legacy and current records.
///
/// Both schemas usually share one key and differ only in payload shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationKeys {
    pub legacy: String,
    pub current: String,
}

impl MigrationKeys {
    pub fn new(legacy: impl Into<String>, current: impl Into<String>) -> Self {
        Self {
            legacy: legacy.into(),
            current: current.into(),
        }
    }

    /// `StorageConfiguration__<logical_name>` for both schemas.
    pub fn shared(logical_name: &str) -> Self {
        let key = configuration_key(logical_name);
        Self::new(key.clone(), key)
    }
}

/// Result of [`MigrationAdapter::migrate_to_v3`].
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationOutcome<O> {
    /// A current-schema record was already present.
    AlreadyMigrated,
    /// Converted record, ready to be persisted.
    Migrated(StorageConfiguration<O>),
}

impl<O> MigrationOutcome<O> {
    pub fn is_migrated(&self) -> bool {
        matches!(self, MigrationOutcome::Migrated(_))
    }

    pub fn configuration(&self) -> Option<&StorageConfiguration<O>> {
        match self {
            MigrationOutcome::Migrated(configuration) => Some(configuration),
            MigrationOutcome::AlreadyMigrated => None,
        }
    }
}

/// Moves one store kind's tenant configuration from the legacy schema to
/// the current one.
pub struct MigrationAdapter<L, F>
where
    L: LegacyConfiguration,
    F: StoreClientFactory<L::Kind>,
{
    factory: Arc<StorageContextFactory<L::Kind, F>>,
    provisioned: ContextCache<bool, StorageError>,
    _legacy: PhantomData<fn() -> L>,
}

impl<L, F> MigrationAdapter<L, F>
where
    L: LegacyConfiguration,
    F: StoreClientFactory<L::Kind>,
{
    pub fn new(factory: Arc<StorageContextFactory<L::Kind, F>>) -> Self {
        Self {
            factory,
            provisioned: ContextCache::new(),
            _legacy: PhantomData,
        }
    }

    pub fn factory(&self) -> &Arc<StorageContextFactory<L::Kind, F>> {
        &self.factory
    }

    /// Convert the tenant's legacy record and provision its objects.
    ///
    /// `logical_names` lists the objects served by a legacy record that
    /// names none itself. The physical name is stored in the returned record
    /// only when exactly one object was processed.
    ///
    /// Does not write to the tenant; see [`Self::migrate_and_persist`].
    pub async fn migrate_to_v3(
        &self,
        tenant: &Tenant,
        keys: &MigrationKeys,
        logical_names: &[&str],
    ) -> Result<MigrationOutcome<Options<L>>> {
        if self.current_record(tenant, keys)?.is_some() {
            debug!(tenant_id = %tenant.id, key = %keys.current, "Configuration already migrated");
            return Ok(MigrationOutcome::AlreadyMigrated);
        }

        let legacy = self.legacy_record(tenant, keys)?;
        let current = legacy.to_current();
        let names = object_names::<L>(&legacy, logical_names)?;

        let mut physical_names = Vec::with_capacity(names.len());
        for name in &names {
            let physical = <L::Kind as StoreKind>::NAMING.apply(
                &tenant.id,
                name,
                legacy.disable_tenant_prefix(),
            );
            self.provision(&current, &physical).await?;
            physical_names.push(physical);
        }

        let current = match physical_names.as_slice() {
            [single] => current.with_object_name(single.clone()),
            _ => current,
        };

        info!(
            tenant_id = %tenant.id,
            store = <L::Kind as StoreKind>::NAME,
            objects = physical_names.len(),
            "Configuration migrated"
        );
        Ok(MigrationOutcome::Migrated(current))
    }

    /// Fetch the tenant, migrate it, and write the converted record back
    /// under the tenant's etag.
    ///
    /// The legacy record is left in place.
    pub async fn migrate_and_persist(
        &self,
        store: &dyn TenantStore,
        tenant_id: &str,
        keys: &MigrationKeys,
        logical_names: &[&str],
    ) -> Result<(Tenant, MigrationOutcome<Options<L>>)> {
        let tenant = store.get_tenant(tenant_id).await?;
        let outcome = self.migrate_to_v3(&tenant, keys, logical_names).await?;

        let value = match &outcome {
            MigrationOutcome::AlreadyMigrated => return Ok((tenant, outcome)),
            MigrationOutcome::Migrated(configuration) => serde_json::to_value(configuration)
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
        };

        let updated = store
            .update_tenant(&tenant, vec![(keys.current.clone(), value)], vec![])
            .await?;
        Ok((updated, outcome))
    }

    /// Resolve a client from whichever schema the tenant holds.
    ///
    /// A legacy record is converted on the fly and its object provisioned
    /// once per credential and physical name; nothing is persisted.
    pub async fn resolve_with_fallback(
        &self,
        tenant: &Tenant,
        keys: &MigrationKeys,
        logical_name: &str,
        override_name: Option<&str>,
    ) -> Result<F::Client> {
        if self.current_record(tenant, keys)?.is_some() {
            let definition =
                StorageDefinition::new(logical_name).with_configuration_key(keys.current.clone());
            return self.factory.resolve(tenant, &definition, override_name).await;
        }

        let legacy = self.legacy_record(tenant, keys)?;
        let current = legacy.to_current();
        let name = override_name
            .filter(|name| !name.is_empty())
            .or(legacy.object_name())
            .unwrap_or(logical_name);
        if name.is_empty() {
            return Err(StorageError::invalid(
                <L::Kind as StoreKind>::NAME,
                "no object name was configured or requested",
                current.set_fields(),
            ));
        }

        let physical =
            <L::Kind as StoreKind>::NAMING.apply(&tenant.id, name, legacy.disable_tenant_prefix());
        self.provision(&current, &physical).await?;
        self.factory.client_with_name(&current, physical).await
    }

    /// Number of provisioned objects remembered
    pub fn provisioned(&self) -> usize {
        self.provisioned.len()
    }

    fn current_record<'t>(&self, tenant: &'t Tenant, keys: &MigrationKeys) -> Result<Option<&'t Value>> {
        match tenant.raw_property(&keys.current) {
            Some(value) if value.is_null() => Ok(None),
            Some(value) if <L::Kind as StoreKind>::is_legacy_payload(value) => Ok(None),
            Some(value) => {
                StorageContextFactory::<L::Kind, F>::parse_configuration(&keys.current, value)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn legacy_record(&self, tenant: &Tenant, keys: &MigrationKeys) -> Result<L> {
        let value = tenant
            .raw_property(&keys.legacy)
            .filter(|value| !value.is_null())
            .ok_or_else(|| StorageError::ConfigurationMissing {
                store: <L::Kind as StoreKind>::NAME,
                tenant_id: tenant.id.clone(),
                key: keys.legacy.clone(),
            })?;

        serde_json::from_value(value.clone()).map_err(|e| {
            StorageError::invalid(
                <L::Kind as StoreKind>::NAME,
                format!("'{}' is not a legacy record: {}", keys.legacy, e),
                vec![],
            )
        })
    }

    async fn provision(
        &self,
        configuration: &StorageConfiguration<Options<L>>,
        physical_name: &str,
    ) -> Result<bool> {
        let key = format!("{}|{}", self.factory.cache_key(configuration)?, physical_name);
        let factory = self.factory.clone();
        let configuration = configuration.clone();
        let physical_name = physical_name.to_string();

        self.provisioned
            .get_or_create(&key, move || async move {
                factory.ensure_exists(&configuration, &physical_name).await
            })
            .await
    }
}

fn object_names<'a, L: LegacyConfiguration>(
    legacy: &'a L,
    logical_names: &[&'a str],
) -> Result<Vec<&'a str>> {
    if let Some(name) = legacy.object_name() {
        return Ok(vec![name]);
    }

    let mut names: Vec<&str> = Vec::new();
    for name in logical_names.iter().copied().filter(|name| !name.is_empty()) {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    if names.is_empty() {
        return Err(StorageError::invalid(
            <L::Kind as StoreKind>::NAME,
            "the legacy record names no object and none were requested",
            vec![],
        ));
    }
    Ok(names)
}

impl<L, F> std::fmt::Debug for MigrationAdapter<L, F>
where
    L: LegacyConfiguration,
    F: StoreClientFactory<L::Kind>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationAdapter")
            .field("store", &<L::Kind as StoreKind>::NAME)
            .field("provisioned", &self.provisioned.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::legacy::LegacyBlobConfiguration;

    #[test]
    fn test_shared_keys() {
        let keys = MigrationKeys::shared("orders");
        assert_eq!(keys.legacy, "StorageConfiguration__orders");
        assert_eq!(keys.legacy, keys.current);
    }

    #[test]
    fn test_record_name_wins() {
        let legacy = LegacyBlobConfiguration {
            container: Some("orders".to_string()),
            ..Default::default()
        };
        let names = object_names(&legacy, &["invoices"]).unwrap();
        assert_eq!(names, vec!["orders"]);
    }

    #[test]
    fn test_requested_names_deduplicated() {
        let legacy = LegacyBlobConfiguration::default();
        let names = object_names(&legacy, &["a", "b", "a", ""]).unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_no_names_is_invalid() {
        let legacy = LegacyBlobConfiguration::default();
        assert!(object_names(&legacy, &[]).unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome: MigrationOutcome<()> = MigrationOutcome::AlreadyMigrated;
        assert!(!outcome.is_migrated());
        assert!(outcome.configuration().is_none());
    }
}
