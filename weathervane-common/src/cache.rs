// weathervane-common/src/cache.rs
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One memoized value and when it was stored.
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
}

/// Process-wide TTL cache keyed by request fingerprint.
///
/// An explicit component instance held by the serving state, not a module
/// global. A single mutex guards the map; concurrent misses on the same
/// key may both compute, which is acceptable duplicate work because every
/// computation here is idempotent.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        TtlCache {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// A stored value, if it is younger than `ttl`. An expired entry is
    /// treated as absent; it stays in the map until overwritten.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<V> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .filter(|entry| entry.created_at.elapsed() < ttl)
            .map(|entry| entry.value.clone())
    }

    /// Store a value under `key`, stamping the current time.
    pub fn put(&self, key: impl Into<String>, value: V) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.into(),
            CacheEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    /// Return the cached value for `key`, or invoke `compute` and store its
    /// result. Errors from `compute` propagate and nothing is stored.
    pub fn get_or_compute<F, E>(&self, key: &str, ttl: Duration, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(hit) = self.get(key, ttl) {
            return Ok(hit);
        }
        let value = compute()?;
        self.put(key, value.clone());
        Ok(value)
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn hit_within_ttl_skips_compute() {
        let cache: TtlCache<u32> = TtlCache::new();
        let calls = Cell::new(0);
        let compute = || -> Result<u32, &'static str> {
            calls.set(calls.get() + 1);
            Ok(42)
        };

        let first = cache.get_or_compute("k", Duration::from_secs(60), compute).unwrap();
        let second = cache
            .get_or_compute("k", Duration::from_secs(60), || -> Result<u32, &'static str> {
                calls.set(calls.get() + 1);
                Ok(99)
            })
            .unwrap();

        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn expired_entry_is_recomputed() {
        let cache: TtlCache<u32> = TtlCache::new();
        cache.put("k", 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k", Duration::from_millis(1)), None);

        let fresh = cache
            .get_or_compute("k", Duration::from_millis(1), || -> Result<u32, &'static str> { Ok(2) })
            .unwrap();
        assert_eq!(fresh, 2);
        assert_eq!(cache.get("k", Duration::from_secs(60)), Some(2));
    }

    #[test]
    fn compute_error_propagates_and_stores_nothing() {
        let cache: TtlCache<u32> = TtlCache::new();
        let err = cache
            .get_or_compute("k", Duration::from_secs(60), || Err("boom"))
            .unwrap_err();
        assert_eq!(err, "boom");
        assert_eq!(cache.get("k", Duration::from_secs(60)), None);
    }

    #[test]
    fn keys_are_independent() {
        let cache: TtlCache<&'static str> = TtlCache::new();
        cache.put("current_nairobi", "a");
        cache.put("current_london", "b");
        assert_eq!(cache.get("current_nairobi", Duration::from_secs(60)), Some("a"));
        assert_eq!(cache.get("current_london", Duration::from_secs(60)), Some("b"));
    }
}
