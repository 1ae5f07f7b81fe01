//! Tenant store error types.

use thiserror::Error;

/// Result type for tenant operations.
pub type Result<T> = std::result::Result<T, TenantError>;

/// Errors reported by tenant stores.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TenantError {
    /// No tenant with this id.
    #[error("Tenant not found: {0}")]
    NotFound(String),

    /// The caller's version tag no longer matches the stored tenant.
    #[error("Tenant '{tenant_id}' was modified concurrently (expected etag {expected:?}, found {actual:?})")]
    Conflict {
        /// Tenant id
        tenant_id: String,
        /// Version tag the caller held
        expected: Option<String>,
        /// Version tag currently stored
        actual: Option<String>,
    },

    /// An update that would not change anything.
    #[error("Tenant '{0}' was not modified")]
    NotModified(String),

    /// Tenant id already taken.
    #[error("Tenant already exists: {0}")]
    AlreadyExists(String),

    /// Property payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backing store failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl TenantError {
    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is an optimistic-concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
