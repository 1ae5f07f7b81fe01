//! Tenant Store
//!
//! The persistence collaborator for tenants. Implementations own the
//! records; callers only ever hold snapshots and write through
//! [`TenantStore::update_tenant`], which re-validates the snapshot's etag.

use crate::error::{Result, TenantError};
use crate::tenant::{TENANT_ID_SEPARATOR, Tenant};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Tenant store trait (implement with your database)
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Fetch a tenant by id.
    async fn get_tenant(&self, id: &str) -> Result<Tenant>;

    /// Set and remove properties on a tenant.
    ///
    /// Fails with [`TenantError::Conflict`] if `tenant.etag` is stale and with
    /// [`TenantError::NotModified`] if there is nothing to set or remove.
    async fn update_tenant(
        &self,
        tenant: &Tenant,
        properties_to_set: Vec<(String, serde_json::Value)>,
        properties_to_remove: Vec<String>,
    ) -> Result<Tenant>;

    /// Create a child tenant beneath `parent_id`.
    async fn create_child_tenant(&self, parent_id: &str, name: &str) -> Result<Tenant>;
}

/// In-memory tenant store for testing and local development
#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    tenants: RwLock<HashMap<String, Tenant>>,
}

impl InMemoryTenantStore {
    /// Create new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a tenant, assigning a fresh etag.
    pub fn insert(&self, mut tenant: Tenant) -> Result<Tenant> {
        let mut tenants = self.tenants.write();
        if tenants.contains_key(&tenant.id) {
            return Err(TenantError::AlreadyExists(tenant.id));
        }
        tenant.etag = Some(new_etag());
        tenants.insert(tenant.id.clone(), tenant.clone());
        Ok(tenant)
    }

    /// Number of stored tenants
    pub fn len(&self) -> usize {
        self.tenants.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.tenants.read().is_empty()
    }
}

fn new_etag() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn get_tenant(&self, id: &str) -> Result<Tenant> {
        self.tenants
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| TenantError::NotFound(id.to_string()))
    }

    async fn update_tenant(
        &self,
        tenant: &Tenant,
        properties_to_set: Vec<(String, serde_json::Value)>,
        properties_to_remove: Vec<String>,
    ) -> Result<Tenant> {
        if properties_to_set.is_empty() && properties_to_remove.is_empty() {
            return Err(TenantError::NotModified(tenant.id.clone()));
        }

        let mut tenants = self.tenants.write();
        let stored = tenants
            .get_mut(&tenant.id)
            .ok_or_else(|| TenantError::NotFound(tenant.id.clone()))?;

        if stored.etag != tenant.etag {
            return Err(TenantError::Conflict {
                tenant_id: tenant.id.clone(),
                expected: tenant.etag.clone(),
                actual: stored.etag.clone(),
            });
        }

        for key in &properties_to_remove {
            stored.properties.remove(key);
        }
        for (key, value) in properties_to_set {
            stored.properties.insert(key, value);
        }
        stored.etag = Some(new_etag());

        debug!(
            tenant_id = %tenant.id,
            removed = properties_to_remove.len(),
            "Tenant updated"
        );

        Ok(stored.clone())
    }

    async fn create_child_tenant(&self, parent_id: &str, name: &str) -> Result<Tenant> {
        if !self.tenants.read().contains_key(parent_id) {
            return Err(TenantError::NotFound(parent_id.to_string()));
        }

        let id = format!(
            "{}{}{}",
            parent_id,
            TENANT_ID_SEPARATOR,
            Uuid::new_v4().simple()
        );
        self.insert(Tenant::new(id, name))
    }
}
