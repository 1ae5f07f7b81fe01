//! Secret resolution.

use crate::connection::Secret;
use crate::error::SecretError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Secret vault collaborator (implement with your vault SDK)
#[async_trait]
pub trait SecretVault: Send + Sync {
    /// Fetch the current value of `secret_name` from `vault_name`.
    async fn get_secret(
        &self,
        vault_name: &str,
        secret_name: &str,
    ) -> std::result::Result<String, SecretError>;
}

/// Pass-through to a [`SecretVault`].
///
/// Adds no retries and no caching; vault errors come back unchanged.
/// Caching happens one level up, in the factories' context cache.
#[derive(Clone)]
pub struct SecretResolver {
    vault: Arc<dyn SecretVault>,
}

impl SecretResolver {
    pub fn new(vault: Arc<dyn SecretVault>) -> Self {
        Self { vault }
    }

    /// Resolve a secret to its plaintext.
    pub async fn resolve_secret(
        &self,
        vault_name: &str,
        secret_name: &str,
    ) -> std::result::Result<Secret, SecretError> {
        debug!(vault = %vault_name, secret = %secret_name, "Resolving secret");
        let value = self.vault.get_secret(vault_name, secret_name).await?;
        Ok(Secret::new(value))
    }
}

impl std::fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretResolver").finish_non_exhaustive()
    }
}

/// In-memory vault for testing and local development.
///
/// Counts requests so tests can check how often the vault was hit.
#[derive(Debug, Default)]
pub struct InMemorySecretVault {
    secrets: RwLock<HashMap<(String, String), String>>,
    requests: AtomicUsize,
}

impl InMemorySecretVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_secret(
        self,
        vault_name: impl Into<String>,
        secret_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.insert(vault_name, secret_name, value);
        self
    }

    pub fn insert(
        &self,
        vault_name: impl Into<String>,
        secret_name: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.secrets
            .write()
            .insert((vault_name.into(), secret_name.into()), value.into());
    }

    pub fn remove(&self, vault_name: &str, secret_name: &str) -> Option<String> {
        self.secrets
            .write()
            .remove(&(vault_name.to_string(), secret_name.to_string()))
    }

    /// Number of `get_secret` calls served so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretVault for InMemorySecretVault {
    async fn get_secret(
        &self,
        vault_name: &str,
        secret_name: &str,
    ) -> std::result::Result<String, SecretError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.secrets
            .read()
            .get(&(vault_name.to_string(), secret_name.to_string()))
            .cloned()
            .ok_or_else(|| SecretError::NotFound {
                vault_name: vault_name.to_string(),
                secret_name: secret_name.to_string(),
            })
    }
}
