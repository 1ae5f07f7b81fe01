//! Tenancy for tenstore
//!
//! Tenant records and the tenant-store collaborator that the storage
//! context factories read configuration from.
//!
//! # Features
//!
//! - **Hierarchical tenants** - ids are `/`-separated paths
//! - **Property bag** - per-tenant JSON records keyed by string
//! - **Optimistic concurrency** - every write re-validates the tenant's etag
//! - **In-memory store** - for tests and local development
//!
//! # Quick Start
//!
//! ```rust
//! use tenstore_tenancy::*;
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryTenantStore::new();
//! let root = store.insert(Tenant::new("root", "Root")).unwrap();
//!
//! let updated = store
//!     .update_tenant(&root, vec![("plan".to_string(), serde_json::json!("pro"))], vec![])
//!     .await
//!     .unwrap();
//!
//! // The old snapshot is now stale.
//! let stale = store.update_tenant(&root, vec![], vec!["plan".to_string()]).await;
//! assert!(matches!(stale, Err(TenantError::Conflict { .. })));
//! # let _ = updated;
//! # });
//! ```

pub mod error;
pub mod store;
pub mod tenant;

pub use error::{Result, TenantError};
pub use store::{InMemoryTenantStore, TenantStore};
pub use tenant::{TENANT_ID_SEPARATOR, Tenant};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::TenantError;
    pub use crate::store::{InMemoryTenantStore, TenantStore};
    pub use crate::tenant::Tenant;
}
