#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tenstore_storage::{
    ClientError, ClientRequest, InMemorySecretVault, LocalDevelopmentSettings, ResolvedConnection,
    SecretError, SecretResolver, SecretVault, StorageContextFactory, StoreClientFactory,
    StoreKind,
};

/// What the recording factory hands out.
#[derive(Debug, Clone)]
pub struct RecordedClient {
    pub endpoint: String,
    pub physical_name: String,
    pub connection: ResolvedConnection,
}

/// Client factory that remembers which objects exist.
#[derive(Debug, Default)]
pub struct RecordingClients {
    existing: Mutex<HashSet<String>>,
    provision_calls: AtomicUsize,
    creations: AtomicUsize,
    fail_provisioning: AtomicBool,
}

impl RecordingClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects actually created.
    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    /// Number of `create_if_not_exists` calls.
    pub fn provision_calls(&self) -> usize {
        self.provision_calls.load(Ordering::SeqCst)
    }

    pub fn exists(&self, physical_name: &str) -> bool {
        self.existing.lock().contains(physical_name)
    }

    pub fn fail_provisioning(&self, fail: bool) {
        self.fail_provisioning.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl<K: StoreKind> StoreClientFactory<K> for RecordingClients {
    type Client = RecordedClient;

    fn create_client(&self, request: &ClientRequest<'_, K>) -> Result<RecordedClient, ClientError> {
        Ok(RecordedClient {
            endpoint: request.endpoint.clone(),
            physical_name: request.physical_name.clone(),
            connection: request.connection.clone(),
        })
    }

    async fn create_if_not_exists(&self, request: &ClientRequest<'_, K>) -> Result<bool, ClientError> {
        self.provision_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_provisioning.load(Ordering::SeqCst) {
            return Err(ClientError::Provisioning("service unavailable".to_string()));
        }

        let created = self.existing.lock().insert(request.physical_name.clone());
        if created {
            self.creations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(created)
    }
}

/// Vault that answers slowly and counts requests.
#[derive(Debug, Default)]
pub struct SlowVault {
    inner: InMemorySecretVault,
    pub delay: Duration,
}

impl SlowVault {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemorySecretVault::new(),
            delay,
        }
    }

    pub fn with_secret(self, vault: &str, secret: &str, value: &str) -> Self {
        self.inner.insert(vault, secret, value);
        self
    }

    pub fn requests(&self) -> usize {
        self.inner.requests()
    }
}

#[async_trait]
impl SecretVault for SlowVault {
    async fn get_secret(&self, vault_name: &str, secret_name: &str) -> Result<String, SecretError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_secret(vault_name, secret_name).await
    }
}

/// Log lines written by a test-local subscriber.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Install a subscriber capturing every level on the current thread.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn factory<K: StoreKind>(
    clients: Arc<RecordingClients>,
    vault: Arc<dyn SecretVault>,
) -> StorageContextFactory<K, RecordingClients> {
    StorageContextFactory::new(
        clients,
        SecretResolver::new(vault),
        LocalDevelopmentSettings::default(),
    )
}
