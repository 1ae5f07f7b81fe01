//! Single-flight context cache.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

type Build<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

struct Entry<T, E> {
    generation: u64,
    build: Build<T, E>,
}

/// Memoizing map from a cache key to one in-flight or completed build.
///
/// For a given key the builder runs at most once while its build is
/// in flight or has succeeded; every concurrent caller awaits the same build
/// and observes the same value or error.
///
/// # Failed builds
///
/// A failed build is evicted once it completes. All callers that were
/// waiting on it see its error; the next call for the key starts a fresh
/// build.
///
/// # Examples
///
/// ```
/// use tenstore_cache::ContextCache;
///
/// # tokio_test::block_on(async {
/// let cache: ContextCache<String, String> = ContextCache::new();
///
/// let first = cache
///     .get_or_create("acct", || async { Ok("secret".to_string()) })
///     .await;
/// let second = cache
///     .get_or_create("acct", || async { Ok("never built".to_string()) })
///     .await;
///
/// assert_eq!(first, second);
/// # });
/// ```
pub struct ContextCache<T, E> {
    entries: Mutex<HashMap<String, Entry<T, E>>>,
    generation: AtomicU64,
}

impl<T, E> ContextCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Return the value cached under `key`, building it with `builder` if
    /// no build exists yet.
    ///
    /// `builder` is only invoked by the caller that installs the build; the
    /// map lock is released before anything is awaited, so builds for
    /// different keys run fully in parallel.
    pub async fn get_or_create<F, Fut>(&self, key: &str, builder: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (generation, build) = {
            let mut entries = self.entries.lock();
            match entries.get(key) {
                Some(entry) => {
                    debug!(key = %key, "Context cache hit");
                    (entry.generation, entry.build.clone())
                }
                None => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                    let build = builder().boxed().shared();
                    entries.insert(
                        key.to_string(),
                        Entry {
                            generation,
                            build: build.clone(),
                        },
                    );
                    debug!(key = %key, generation, "Context cache miss, build started");
                    (generation, build)
                }
            }
        };

        let result = build.await;
        if result.is_err() {
            self.evict_failed(key, generation);
        }
        result
    }

    /// Completed, successful value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .and_then(|entry| entry.build.peek())
            .and_then(|result| result.as_ref().ok().cloned())
    }

    /// Whether a build (in flight or completed) exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Drop the build for `key`. Callers already awaiting it still get its
    /// result.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Drop every build.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of keys with a build.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no builds.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn evict_failed(&self, key: &str, generation: u64) {
        let mut entries = self.entries.lock();
        // A newer build may already have replaced the failed one.
        if entries.get(key).map(|entry| entry.generation) == Some(generation) {
            entries.remove(key);
            warn!(key = %key, generation, "Context cache build failed, entry evicted");
        }
    }
}

impl<T, E> Default for ContextCache<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for ContextCache<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextCache")
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    type Cache = ContextCache<String, String>;

    #[tokio::test]
    async fn test_builds_once_and_caches() {
        let cache = Cache::new();
        let builds = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let builds = builds.clone();
            let value = cache
                .get_or_create("key", move || async move {
                    builds.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>("value".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "value");
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("key"), Some("value".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_build_is_evicted() {
        let cache = Cache::new();

        let err = cache
            .get_or_create("key", || async { Err("vault unavailable".to_string()) })
            .await
            .unwrap_err();
        assert_eq!(err, "vault unavailable");
        assert!(!cache.contains("key"));

        let value = cache
            .get_or_create("key", || async { Ok("recovered".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "recovered");
    }

    #[tokio::test]
    async fn test_get_ignores_in_flight_and_failed() {
        let cache = Cache::new();
        assert!(cache.get("missing").is_none());

        let _ = cache
            .get_or_create("bad", || async { Err("nope".to_string()) })
            .await;
        assert!(cache.get("bad").is_none());
    }

    #[tokio::test]
    async fn test_invalidate_forces_rebuild() {
        let cache = Cache::new();
        let builds = Arc::new(AtomicUsize::new(0));

        let build = |builds: Arc<AtomicUsize>| {
            move || async move {
                let n = builds.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(format!("build-{}", n))
            }
        };

        let first = cache.get_or_create("key", build(builds.clone())).await.unwrap();
        assert!(cache.invalidate("key"));
        assert!(!cache.invalidate("key"));
        let second = cache.get_or_create("key", build(builds.clone())).await.unwrap();

        assert_eq!(first, "build-0");
        assert_eq!(second, "build-1");

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_waiter_does_not_restart_build() {
        let cache = Arc::new(Cache::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let first = {
            let cache = cache.clone();
            let builds = builds.clone();
            tokio::spawn(async move {
                cache
                    .get_or_create("key", move || async move {
                        builds.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        Ok::<_, String>("slow".to_string())
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        first.abort();
        let _ = first.await;

        let builds_again = builds.clone();
        let value = cache
            .get_or_create("key", move || async move {
                builds_again.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>("fresh".to_string())
            })
            .await
            .unwrap();

        assert_eq!(value, "slow");
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }
}
