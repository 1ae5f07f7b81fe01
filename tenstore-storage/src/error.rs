//! Storage error types.

use tenstore_tenancy::TenantError;
use thiserror::Error;

/// Result type for storage context operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors reported by a secret vault.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretError {
    /// No such secret.
    #[error("Secret '{secret_name}' not found in vault '{vault_name}'")]
    NotFound {
        /// Vault name
        vault_name: String,
        /// Secret name
        secret_name: String,
    },

    /// The vault rejected our identity.
    #[error("Authentication to vault '{vault_name}' failed: {message}")]
    AuthenticationFailed {
        /// Vault name
        vault_name: String,
        /// Vault-supplied detail
        message: String,
    },

    /// Any other vault failure (throttling, network, ...).
    #[error("Vault '{vault_name}' error: {message}")]
    Vault {
        /// Vault name
        vault_name: String,
        /// Vault-supplied detail
        message: String,
    },
}

/// Errors reported by a backing-store client factory.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// The client could not be built.
    #[error("Client construction failed: {0}")]
    Construction(String),

    /// Creating the physical resource failed.
    #[error("Resource provisioning failed: {0}")]
    Provisioning(String),

    /// The store does not support the operation.
    #[error("Not supported: {0}")]
    Unsupported(String),
}

/// Storage context errors.
///
/// Cloneable so that one failed build can be reported to every caller that
/// was waiting on it.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The tenant has no configuration at the expected key.
    #[error("No {store} configuration for tenant '{tenant_id}' at key '{key}'")]
    ConfigurationMissing {
        /// Store kind
        store: &'static str,
        /// Tenant id
        tenant_id: String,
        /// Property key that was looked up
        key: String,
    },

    /// Configuration is present but unusable.
    #[error("Invalid {store} configuration: {reason} (fields set: [{}])", .fields.join(", "))]
    ConfigurationInvalid {
        /// Store kind
        store: &'static str,
        /// What is wrong
        reason: String,
        /// Names of the credential fields that were set
        fields: Vec<&'static str>,
    },

    /// The vault could not produce the secret.
    #[error("Failed to resolve {store} secret: {source}")]
    SecretResolutionFailed {
        /// Store kind
        store: &'static str,
        /// Vault error
        #[source]
        source: SecretError,
    },

    /// The client factory could not build a client.
    #[error("Failed to create {store} client for '{object_name}': {source}")]
    CreationFailed {
        /// Store kind
        store: &'static str,
        /// Physical object name
        object_name: String,
        /// Client factory error
        #[source]
        source: ClientError,
    },

    /// The physical resource could not be provisioned.
    #[error("Failed to create {store} resource '{object_name}': {source}")]
    ResourceCreationFailed {
        /// Store kind
        store: &'static str,
        /// Physical object name
        object_name: String,
        /// Client factory error
        #[source]
        source: ClientError,
    },

    /// Optimistic-concurrency violation while writing the tenant back.
    #[error("Tenant '{tenant_id}' was modified concurrently; re-fetch it and retry")]
    TenantUpdateConflict {
        /// Tenant id
        tenant_id: String,
    },

    /// Tenant does not exist.
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    /// Any other tenant store failure.
    #[error("Tenant store error: {0}")]
    Tenant(#[source] TenantError),

    /// A configuration record could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Build a [`StorageError::ConfigurationInvalid`].
    pub fn invalid(
        store: &'static str,
        reason: impl Into<String>,
        fields: Vec<&'static str>,
    ) -> Self {
        Self::ConfigurationInvalid {
            store,
            reason: reason.into(),
            fields,
        }
    }

    /// Missing or invalid configuration: fix the configuration, do not retry.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationMissing { .. } | Self::ConfigurationInvalid { .. }
        )
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Conflicts are retryable only after re-fetching the tenant.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SecretResolutionFailed { source, .. } => {
                matches!(source, SecretError::Vault { .. })
            }
            Self::ResourceCreationFailed { .. } | Self::TenantUpdateConflict { .. } => true,
            Self::CreationFailed { source, .. } => matches!(source, ClientError::Provisioning(_)),
            Self::Tenant(TenantError::Storage(_)) => true,
            _ => false,
        }
    }
}

impl From<TenantError> for StorageError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::NotFound(id) => Self::TenantNotFound(id),
            TenantError::Conflict { tenant_id, .. } => Self::TenantUpdateConflict { tenant_id },
            TenantError::Serialization(message) => Self::Serialization(message),
            other => Self::Tenant(other),
        }
    }
}
