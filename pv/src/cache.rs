//! Injected TTL cache
//!
//! One shared cache instance sits in front of the expensive assembly
//! queries. Values are type-erased so a single cache serves prompt
//! records, aggregates, and env var lists; readers downcast back to the
//! type they stored under the key.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::VaultResult;

/// Cache lifetimes. `INFINITE` (zero) disables expiry for the entry.
pub mod ttl {
    use std::time::Duration;

    pub const DEFAULT: Duration = Duration::from_secs(600);
    pub const SHORT: Duration = Duration::from_secs(60);
    pub const MEDIUM: Duration = Duration::from_secs(300);
    pub const LONG: Duration = Duration::from_secs(3600);
    pub const VERY_LONG: Duration = Duration::from_secs(86_400);
    pub const INFINITE: Duration = Duration::ZERO;
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.expires_at.is_none_or(|t| Instant::now() < t)
    }
}

/// Type-erased in-memory cache with per-entry TTLs
#[derive(Default)]
pub struct TtlCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a live entry, if present and stored as `T`.
    ///
    /// Expired entries behave exactly like absent ones and are dropped
    /// on the way out.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Option<T> {
        let mut entries = self.lock();
        if let Some(entry) = entries.get(key) {
            if entry.is_live() {
                return entry.value.downcast_ref::<T>().cloned();
            }
            entries.remove(key);
        }
        None
    }

    /// Store a value under `key` for `ttl` (zero means no expiry)
    pub fn insert<T: Clone + Send + Sync + 'static>(&self, key: &str, value: T, ttl: Duration) {
        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        self.lock().insert(
            key.to_string(),
            Entry {
                value: Arc::new(value),
                expires_at,
            },
        );
    }

    /// Drop a single entry
    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Drop everything
    pub fn flush(&self) {
        self.lock().clear();
    }

    /// Serve from cache, or run `fetch` and cache only a successful result.
    ///
    /// Failed fetches are never cached. Concurrent misses on the same key
    /// may each run `fetch`; the last writer wins.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> VaultResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = VaultResult<T>>,
    {
        if let Some(hit) = self.get::<T>(key) {
            debug!(key, "cache hit");
            return Ok(hit);
        }
        let value = fetch().await?;
        self.insert(key, value.clone(), ttl);
        debug!(key, "cache fill");
        Ok(value)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_insert_get_and_type_mismatch() {
        let cache = TtlCache::new();
        cache.insert("answer", 42u32, ttl::DEFAULT);

        assert_eq!(cache.get::<u32>("answer"), Some(42));
        assert_eq!(cache.get::<String>("answer"), None);
        assert_eq!(cache.get::<u32>("missing"), None);
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let cache = TtlCache::new();
        cache.insert("pinned", "forever".to_string(), ttl::INFINITE);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get::<String>("pinned"), Some("forever".to_string()));
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let cache = TtlCache::new();
        cache.insert("blink", 1u8, Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get::<u8>("blink"), None);
    }

    #[test]
    fn test_remove_and_flush() {
        let cache = TtlCache::new();
        cache.insert("a", 1u32, ttl::DEFAULT);
        cache.insert("b", 2u32, ttl::DEFAULT);

        cache.remove("a");
        assert_eq!(cache.get::<u32>("a"), None);
        assert_eq!(cache.get::<u32>("b"), Some(2));

        cache.flush();
        assert_eq!(cache.get::<u32>("b"), None);
    }

    #[tokio::test]
    async fn test_get_or_compute_caches_success() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_compute("key", ttl::DEFAULT, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("computed".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "computed");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_compute_never_caches_failure() {
        use crate::error::VaultError;

        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result: VaultResult<String> = cache
                .get_or_compute("key", ttl::DEFAULT, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(VaultError::NotFound("nope".to_string()))
                })
                .await;
            assert!(result.is_err());
        }

        // Both calls fetched; the failure was never stored
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get::<String>("key"), None);
    }
}
