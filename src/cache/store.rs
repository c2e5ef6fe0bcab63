//! Cache storage.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use lru::LruCache;
use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::util::clock::Clock;

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Lifetime of a stored response.
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub const METRIC_CACHE_HIT: &str = "product_sync_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "product_sync_cache_miss_total";
pub const METRIC_CACHE_EVICT: &str = "product_sync_cache_evict_total";
pub const METRIC_CACHE_EXPIRED: &str = "product_sync_cache_expired_total";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Raw upstream body plus its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub body: String,
    pub stored_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

/// Key/value store for upstream responses.
pub trait ProductCache: Send + Sync {
    /// Fresh entry for `key`; expired entries are dropped and reported as misses.
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    fn put(&self, key: CacheKey, body: String, ttl: Duration) -> Result<(), CacheError>;

    /// Remove every entry whose key starts with `prefix`, returning how many were removed.
    fn clear(&self, prefix: &str) -> Result<usize, CacheError>;
}

/// In-memory LRU store.
pub struct MemoryCacheStore {
    entries: RwLock<LruCache<CacheKey, CacheEntry>>,
    clock: Arc<dyn Clock>,
    enabled: bool,
}

impl MemoryCacheStore {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
            clock,
            enabled: config.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProductCache for MemoryCacheStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        if !self.enabled {
            return Ok(None);
        }

        let now = self.clock.now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");

        let Some(entry) = entries.get(key).cloned() else {
            counter!(METRIC_CACHE_MISS).increment(1);
            return Ok(None);
        };

        if entry.is_fresh(now) {
            counter!(METRIC_CACHE_HIT).increment(1);
            return Ok(Some(entry));
        }

        entries.pop(key);
        counter!(METRIC_CACHE_EXPIRED).increment(1);
        counter!(METRIC_CACHE_MISS).increment(1);
        debug!(target_module = SOURCE, key = %key, "Dropped expired cache entry");
        Ok(None)
    }

    fn put(&self, key: CacheKey, body: String, ttl: Duration) -> Result<(), CacheError> {
        if !self.enabled {
            return Ok(());
        }

        let stored_at = self.clock.now();
        let entry = CacheEntry {
            body,
            stored_at,
            expires_at: stored_at + ttl,
        };

        let evicted = rw_write(&self.entries, SOURCE, "put").push(key.clone(), entry);
        // `push` also hands back the previous value when the key was already present.
        if let Some((evicted_key, _)) = evicted.filter(|(evicted_key, _)| *evicted_key != key) {
            counter!(METRIC_CACHE_EVICT).increment(1);
            debug!(target_module = SOURCE, key = %evicted_key, "Evicted cache entry at capacity");
        }

        Ok(())
    }

    fn clear(&self, prefix: &str) -> Result<usize, CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "clear");
        let doomed: Vec<CacheKey> = entries
            .iter()
            .filter(|(key, _)| key.has_prefix(prefix))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            entries.pop(key);
        }

        Ok(doomed.len())
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use time::macros::datetime;

    use super::*;
    use crate::cache::keys::CACHE_NAMESPACE;
    use crate::domain::identifiers::ProductId;
    use crate::util::clock::ManualClock;

    fn key(id: &str) -> CacheKey {
        CacheKey::for_ids(&[ProductId::parse(id).expect("valid id")])
    }

    fn store_with(config: CacheConfig) -> (MemoryCacheStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(datetime!(2024-01-15 12:00:00 UTC)));
        (MemoryCacheStore::new(&config, clock.clone()), clock)
    }

    #[test]
    fn roundtrip_within_ttl() {
        let (store, clock) = store_with(CacheConfig::default());
        let key = key("B08N5WRWNW");

        assert!(store.get(&key).unwrap().is_none());
        store.put(key.clone(), "{}".into(), CACHE_TTL).unwrap();

        clock.advance(Duration::from_secs(23 * 60 * 60));
        let entry = store.get(&key).unwrap().expect("still fresh");
        assert_eq!(entry.body, "{}");
        assert_eq!(entry.expires_at, datetime!(2024-01-16 12:00:00 UTC));
    }

    #[test]
    fn entry_expires_after_ttl() {
        let (store, clock) = store_with(CacheConfig::default());
        let key = key("B08N5WRWNW");
        store.put(key.clone(), "{}".into(), CACHE_TTL).unwrap();

        clock.advance(CACHE_TTL);
        assert!(store.get(&key).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn clear_removes_only_namespaced_entries() {
        let (store, _clock) = store_with(CacheConfig::default());
        store.put(key("B08N5WRWNW"), "a".into(), CACHE_TTL).unwrap();
        store.put(key("B07XJ8C8F5"), "b".into(), CACHE_TTL).unwrap();

        assert_eq!(store.clear("other_").unwrap(), 0);
        assert_eq!(store.clear(CACHE_NAMESPACE).unwrap(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn lru_eviction_at_capacity() {
        let (store, _clock) = store_with(CacheConfig {
            capacity: 1,
            ..Default::default()
        });
        store.put(key("B08N5WRWNW"), "a".into(), CACHE_TTL).unwrap();
        store.put(key("B07XJ8C8F5"), "b".into(), CACHE_TTL).unwrap();

        assert!(store.get(&key("B08N5WRWNW")).unwrap().is_none());
        assert!(store.get(&key("B07XJ8C8F5")).unwrap().is_some());
    }

    #[test]
    fn overwrite_replaces_entry() {
        let (store, _clock) = store_with(CacheConfig::default());
        store.put(key("B08N5WRWNW"), "old".into(), CACHE_TTL).unwrap();
        store.put(key("B08N5WRWNW"), "new".into(), CACHE_TTL).unwrap();

        let entry = store.get(&key("B08N5WRWNW")).unwrap().expect("cached");
        assert_eq!(entry.body, "new");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn disabled_store_never_holds_entries() {
        let (store, _clock) = store_with(CacheConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(!store.is_enabled());
        store.put(key("B08N5WRWNW"), "a".into(), CACHE_TTL).unwrap();
        assert!(store.get(&key("B08N5WRWNW")).unwrap().is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let (store, _clock) = store_with(CacheConfig::default());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.entries.write().expect("lock should be acquired");
            panic!("poison cache lock");
        }));

        store.put(key("B08N5WRWNW"), "a".into(), CACHE_TTL).unwrap();
        assert!(store.get(&key("B08N5WRWNW")).unwrap().is_some());
    }
}
