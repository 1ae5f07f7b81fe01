//! Context caching for tenstore
//!
//! A keyed, concurrency-safe memoizing map used by the storage context
//! factories to resolve each secret and build each shared connection once.
//!
//! ## Guarantees
//!
//! - **Single flight** - concurrent callers for one key share one build
//! - **Parallel keys** - builds for different keys never wait on each other
//! - **Evict on failure** - a failed build is reported to every waiter and
//!   then dropped, so a later call retries
//!
//! ## Quick Start
//!
//! ```rust
//! use tenstore_cache::ContextCache;
//!
//! # tokio_test::block_on(async {
//! let cache: ContextCache<String, String> = ContextCache::new();
//! let value = cache
//!     .get_or_create("vault:ops/storage-key", || async {
//!         // resolve a secret, open a connection, ...
//!         Ok("resolved".to_string())
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(value, "resolved");
//! # });
//! ```

pub mod context;

pub use context::ContextCache;
