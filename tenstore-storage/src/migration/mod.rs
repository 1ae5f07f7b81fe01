//! Migration from the legacy configuration schema.

pub mod adapter;
pub mod legacy;

pub use adapter::{MigrationAdapter, MigrationKeys, MigrationOutcome};
pub use legacy::{
    LegacyBlobConfiguration, LegacyConfiguration, LegacyCosmosConfiguration,
    LegacyGremlinConfiguration, LegacyPublicAccessType, LegacySqlConfiguration,
    LegacyTableConfiguration, from_legacy_to_current,
};
