//! Content-addressed loudness cache
//!
//! Maps (SHA-256 of the audio bytes, applied linear gain) to an integrated
//! loudness value. Entries are never evicted: the key space is bounded by
//! the tracks and gain settings a user actually tries, and any change of
//! bytes or gain produces a different key.

use mixdown_core::{storage, ContentHash, KeyValueStore};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Prefix of cache entries written through to the key-value store
const STORE_KEY_PREFIX: &str = "lufs";

/// Composite cache key: `<hash>|<gain>`
///
/// The gain is formatted with `f64`'s shortest round-trip representation,
/// so two keys are equal exactly when the hash and gain bits are.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for `hash` at `linear_gain`
    pub fn new(hash: &ContentHash, linear_gain: f64) -> Self {
        // One key for both zeros
        let gain = if linear_gain == 0.0 { 0.0 } else { linear_gain };
        Self(format!("{}|{}", hash, gain))
    }

    /// Key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn store_key(&self) -> String {
        format!("{}|{}", STORE_KEY_PREFIX, self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that required an analysis
    pub misses: u64,
}

/// Memoization layer for integrated loudness
///
/// Safe to share between concurrent jobs. Two jobs racing on the same key
/// both compute and store the same value.
pub struct ResultCache {
    entries: RwLock<HashMap<CacheKey, f64>>,
    store: Option<Arc<dyn KeyValueStore>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// Create a process-lifetime cache
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            store: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create a cache that also writes entries through to `store`
    ///
    /// Entries found in the store are served on a memory miss.
    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::new()
        }
    }

    /// Look up the loudness of `hash` rendered at `linear_gain`
    pub fn get(&self, hash: &ContentHash, linear_gain: f64) -> Option<f64> {
        let key = CacheKey::new(hash, linear_gain);

        let cached = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied();
        let found = cached.or_else(|| self.load_persisted(&key));

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Loudness cache hit for {}", key);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store the loudness of `hash` rendered at `linear_gain`
    pub fn put(&self, hash: &ContentHash, linear_gain: f64, lufs: f64) {
        let key = CacheKey::new(hash, linear_gain);

        if let Some(store) = &self.store {
            // JSON has no -inf; silent results stay in memory only
            if lufs.is_finite() {
                if let Err(e) = storage::save(store.as_ref(), &key.store_key(), &lufs) {
                    warn!("Failed to persist loudness for {}: {}", key, e);
                }
            }
        }

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, lufs);
    }

    fn load_persisted(&self, key: &CacheKey) -> Option<f64> {
        let store = self.store.as_ref()?;
        match storage::load::<f64>(store.as_ref(), &key.store_key()) {
            Ok(Some(lufs)) => {
                self.entries
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key.clone(), lufs);
                Some(lufs)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Number of entries in memory
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hit/miss counters since creation
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.len())
            .field("persistent", &self.store.is_some())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixdown_core::MemoryStore;
    use serde_json::json;

    fn hash(bytes: &[u8]) -> ContentHash {
        ContentHash::of(bytes)
    }

    #[test]
    fn key_embeds_hash_and_gain() {
        let h = hash(b"abc");
        let key = CacheKey::new(&h, 1.5);
        assert_eq!(key.as_str(), format!("{}|1.5", h));
        assert_eq!(CacheKey::new(&h, -0.0), CacheKey::new(&h, 0.0));
        assert_ne!(CacheKey::new(&h, 1.0), CacheKey::new(&h, 1.0 + f64::EPSILON));
    }

    #[test]
    fn get_after_put() {
        let cache = ResultCache::new();
        let h = hash(b"drums");
        assert_eq!(cache.get(&h, 1.0), None);
        cache.put(&h, 1.0, -17.25);
        assert_eq!(cache.get(&h, 1.0), Some(-17.25));
        assert_eq!(cache.get(&h, 1.5), None);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 2 });
    }

    #[test]
    fn silence_is_cached_in_memory_only() {
        let store = Arc::new(MemoryStore::new());
        let cache = ResultCache::with_store(store.clone());
        let h = hash(b"silence");
        cache.put(&h, 1.0, f64::NEG_INFINITY);
        assert_eq!(cache.get(&h, 1.0), Some(f64::NEG_INFINITY));
        assert!(store.is_empty());
    }

    #[test]
    fn write_through_survives_a_new_cache() {
        let store = Arc::new(MemoryStore::new());
        let h = hash(b"vocals");
        ResultCache::with_store(store.clone()).put(&h, 0.5, -12.0);

        let key = format!("lufs|{}|0.5", h);
        assert_eq!(store.get(&key), Some(json!(-12.0)));

        let fresh = ResultCache::with_store(store);
        assert!(fresh.is_empty());
        assert_eq!(fresh.get(&h, 0.5), Some(-12.0));
        assert_eq!(fresh.len(), 1);
    }

    #[test]
    fn unreadable_persisted_entry_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        let h = hash(b"bass");
        store.set(&format!("lufs|{}|1", h), json!("loud"));
        let cache = ResultCache::with_store(store);
        assert_eq!(cache.get(&h, 1.0), None);
    }
}
