//! Naming transform.
//!
//! Maps a tenant id and a free-text logical name onto a name every backing
//! store accepts. The mapping is stable: changing it would orphan physical
//! resources created under the old names.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// How a store kind turns a logical name into a physical one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamingPolicy {
    /// Tenant-scope then SHA-1 hex (blob containers, document and graph
    /// containers).
    Hashed,
    /// As [`NamingPolicy::Hashed`], prefixed with `t` because table names
    /// must start with a letter.
    HashedTable,
    /// Tenant-scope only. Relational database names tolerate free text.
    TenantScoped,
}

impl NamingPolicy {
    /// Physical name for `logical_name` within `tenant_id`.
    pub fn apply(self, tenant_id: &str, logical_name: &str, disable_tenant_prefix: bool) -> String {
        let scoped = if disable_tenant_prefix {
            logical_name.to_string()
        } else {
            tenanted_name(tenant_id, logical_name)
        };

        match self {
            NamingPolicy::Hashed => hash_and_encode(&scoped),
            NamingPolicy::HashedTable => format!("t{}", hash_and_encode(&scoped)),
            NamingPolicy::TenantScoped => scoped,
        }
    }
}

/// `lowercase(tenant_id) + "-" + logical_name`.
///
/// Only the tenant id is case-folded; the logical name is kept verbatim.
pub fn tenanted_name(tenant_id: &str, logical_name: &str) -> String {
    format!("{}-{}", tenant_id.to_lowercase(), logical_name)
}

/// Lowercase hex SHA-1 of the UTF-8 bytes of `name` (40 characters).
pub fn hash_and_encode(name: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(name.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hashed physical name, the default for stores with strict naming rules.
pub fn physical_name(tenant_id: &str, logical_name: &str, disable_tenant_prefix: bool) -> String {
    NamingPolicy::Hashed.apply(tenant_id, logical_name, disable_tenant_prefix)
}
