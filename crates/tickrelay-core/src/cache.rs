//! Time-bounded in-memory cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug)]
struct CacheInner<V> {
    map: HashMap<String, Entry<V>>,
    default_ttl: Duration,
}

impl<V: Clone> CacheInner<V> {
    fn new(default_ttl: Duration) -> Self {
        Self {
            map: HashMap::new(),
            default_ttl,
        }
    }

    fn get(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();
        match self.map.get(key) {
            Some(entry) if entry.is_expired(now) => {
                // Lazy expiry: a read of a stale entry evicts it.
                self.map.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    fn set(&mut self, key: String, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.map.insert(key, Entry { value, expires_at });
    }

    fn cleanup(&mut self) {
        let now = Instant::now();
        self.map.retain(|_, entry| !entry.is_expired(now));
    }
}

/// Thread-safe key-value store with per-entry expiry.
///
/// Expiry is enforced lazily on `get`/`has`; [`TtlCache::cleanup`] exists
/// only to reclaim memory from entries nothing reads anymore. `len` counts
/// stale entries that have not yet been swept or read.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    inner: Arc<tokio::sync::RwLock<CacheInner<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::new(
                config.default_ttl,
            ))),
        }
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self::new(CacheConfig { default_ttl })
    }

    /// Stored value for `key`, or `None` if absent or expired.
    ///
    /// Reading an expired entry evicts it as a side effect.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut store = self.inner.write().await;
        store.get(key)
    }

    /// Insert or overwrite with the default TTL.
    pub async fn set(&self, key: impl Into<String>, value: V) {
        let mut store = self.inner.write().await;
        let ttl = store.default_ttl;
        store.set(key.into(), value, ttl);
    }

    /// Insert or overwrite with an explicit TTL.
    pub async fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let mut store = self.inner.write().await;
        store.set(key.into(), value, ttl);
    }

    /// Whether a live entry exists for `key`, applying the same lazy-expiry
    /// rule as `get`.
    pub async fn has(&self, key: &str) -> bool {
        let mut store = self.inner.write().await;
        store.get(key).is_some()
    }

    /// Remove an entry. Returns whether one was present (stale or not).
    pub async fn remove(&self, key: &str) -> bool {
        let mut store = self.inner.write().await;
        store.map.remove(key).is_some()
    }

    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.map.clear();
    }

    /// Entry count, including expired entries not yet evicted.
    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Proactively sweep expired entries. Memory reclamation only; `get`
    /// and `has` already refuse expired entries without this.
    pub async fn cleanup(&self) {
        let mut store = self.inner.write().await;
        store.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = TtlCache::with_default_ttl(Duration::from_secs(1));

        assert!(cache.get("quote:AAPL").await.is_none());

        cache.set("quote:AAPL", String::from("190.12")).await;
        assert_eq!(
            cache.get("quote:AAPL").await,
            Some(String::from("190.12"))
        );

        cache.set("quote:AAPL", String::from("191.00")).await;
        assert_eq!(
            cache.get("quote:AAPL").await,
            Some(String::from("191.00"))
        );
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss_for_get_and_has() {
        let cache = TtlCache::with_default_ttl(Duration::from_millis(50));

        cache.set("k", 7_u32).await;
        assert!(cache.has("k").await);

        sleep(Duration::from_millis(100)).await;
        assert!(cache.get("k").await.is_none());
        assert!(!cache.has("k").await);
    }

    #[tokio::test]
    async fn len_counts_stale_entries_until_read() {
        let cache = TtlCache::with_default_ttl(Duration::from_millis(50));

        cache.set("stale", 1_u8).await;
        sleep(Duration::from_millis(100)).await;

        // Expired but unread: still occupies a slot.
        assert_eq!(cache.len().await, 1);

        // The read evicts it.
        assert!(cache.get("stale").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn ttl_override_beats_default() {
        let cache = TtlCache::with_default_ttl(Duration::from_secs(60));

        cache
            .set_with_ttl("short", String::from("v"), Duration::from_millis(50))
            .await;
        assert!(cache.has("short").await);

        sleep(Duration::from_millis(100)).await;
        assert!(cache.get("short").await.is_none());
    }

    #[tokio::test]
    async fn cleanup_sweeps_only_expired_entries() {
        let cache = TtlCache::with_default_ttl(Duration::from_secs(60));

        cache
            .set_with_ttl("old", 1_u8, Duration::from_millis(30))
            .await;
        cache.set("fresh", 2_u8).await;

        sleep(Duration::from_millis(80)).await;
        cache.cleanup().await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("fresh").await, Some(2));
    }

    #[tokio::test]
    async fn remove_and_clear_behave_as_map_operations() {
        let cache = TtlCache::with_default_ttl(Duration::from_secs(60));

        cache.set("a", 1_u8).await;
        cache.set("b", 2_u8).await;

        assert!(cache.remove("a").await);
        assert!(!cache.remove("a").await);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
