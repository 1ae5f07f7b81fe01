// tenstore - tenant-scoped storage context resolution
//
// Turns logical, tenant-agnostic storage requests into clients pointed at
// each tenant's own physical containers, tables and databases.

// Re-export core functionality
pub use tenstore_storage::*;

pub use tenstore_cache;
pub use tenstore_storage;
pub use tenstore_tenancy;

pub use tenstore_cache::ContextCache;
pub use tenstore_tenancy::{InMemoryTenantStore, Tenant, TenantError, TenantStore};

// Re-export optional crates
#[cfg(feature = "config")]
pub use tenstore_config;

/// Initialize JSON tracing filtered by `RUST_LOG` (default `info`).
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    install(filter)
}

/// Initialize JSON tracing with an explicit filter, e.g. `"tenstore_storage=debug"`.
pub fn init_tracing_with_level(level: &str) -> bool {
    install(tracing_subscriber::EnvFilter::new(level))
}

fn install(filter: tracing_subscriber::EnvFilter) -> bool {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .try_init()
        .is_ok()
}

/// Prelude for common imports
pub mod prelude {
    pub use tenstore_storage::prelude::*;
    pub use tenstore_tenancy::prelude::*;

    pub use tenstore_cache::ContextCache;

    #[cfg(feature = "config")]
    pub use tenstore_config::ConfigManager;

    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
}
