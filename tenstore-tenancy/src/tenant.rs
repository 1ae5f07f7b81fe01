//! Tenant Records
//!
//! A tenant is identified by a hierarchical id (`root/child/grandchild`) and
//! carries an untyped property bag in which per-store configuration records
//! are persisted.

use crate::error::{Result, TenantError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Separator between the segments of a hierarchical tenant id.
pub const TENANT_ID_SEPARATOR: char = '/';

/// Tenant information as read from a tenant store.
///
/// Treat a `Tenant` as a snapshot: changes go through
/// [`TenantStore::update_tenant`](crate::TenantStore::update_tenant), which
/// hands back a new snapshot with a new `etag`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tenant {
    /// Hierarchical tenant identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Property bag (configuration records, feature switches, ...)
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,

    /// Optimistic-concurrency version tag
    pub etag: Option<String>,
}

impl Tenant {
    /// Create a new tenant
    ///
    /// # Examples
    ///
    /// ```
    /// use tenstore_tenancy::Tenant;
    ///
    /// let tenant = Tenant::new("root/acme", "acme-corp");
    /// assert_eq!(tenant.parent_id(), Some("root"));
    /// ```
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            properties: HashMap::new(),
            etag: None,
        }
    }

    /// Add a property, serializing the value
    ///
    /// Fails with [`TenantError::Serialization`] if the value cannot be
    /// represented as JSON.
    pub fn with_property<T: Serialize>(mut self, key: impl Into<String>, value: &T) -> Result<Self> {
        let key = key.into();
        let value = serde_json::to_value(value)
            .map_err(|e| TenantError::Serialization(format!("property '{}': {}", key, e)))?;
        self.properties.insert(key, value);
        Ok(self)
    }

    /// Add a raw JSON property
    pub fn with_raw_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Set the version tag
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Read a typed property.
    ///
    /// Returns `Ok(None)` when the key is absent and an error when the stored
    /// payload does not have the requested shape.
    pub fn property<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.properties.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| TenantError::Serialization(format!("property '{}': {}", key, e))),
            None => Ok(None),
        }
    }

    /// Read a property without interpreting it
    pub fn raw_property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    /// Check whether a property is present
    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Id of the parent tenant, `None` for the root
    pub fn parent_id(&self) -> Option<&str> {
        self.id
            .rsplit_once(TENANT_ID_SEPARATOR)
            .map(|(parent, _)| parent)
    }

    /// Whether this is a root tenant
    pub fn is_root(&self) -> bool {
        self.parent_id().is_none()
    }
}
