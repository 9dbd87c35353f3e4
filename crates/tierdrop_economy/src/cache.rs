//! # TTL Cache
//!
//! A small cache-aside helper for read endpoints that tolerate slightly
//! stale answers (the public feed, leaderboard-style listings). Entries
//! expire on read; a background sweeper is deliberately absent since the
//! key space is tiny (one key per distinct query shape).

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A cached value with its expiry deadline.
struct CacheSlot<V> {
    value: V,
    expires_at: Instant,
}

/// Keyed cache with per-call TTL.
pub struct TtlCache<K, V> {
    slots: Mutex<HashMap<K, CacheSlot<V>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, or runs `loader`, stores the
    /// result for `ttl`, and returns it.
    ///
    /// The loader runs outside the cache lock, so a slow load does not
    /// stall unrelated keys; concurrent misses on the same key may both
    /// load, and the later store wins.
    pub fn get_or_load(&self, key: K, ttl: Duration, loader: impl FnOnce() -> V) -> V {
        let now = Instant::now();
        {
            let slots = self.slots.lock();
            if let Some(slot) = slots.get(&key) {
                if slot.expires_at > now {
                    return slot.value.clone();
                }
            }
        }

        let value = loader();
        self.slots.lock().insert(
            key,
            CacheSlot {
                value: value.clone(),
                expires_at: now + ttl,
            },
        );
        value
    }

    /// Drops a single key, forcing the next read to reload.
    pub fn invalidate(&self, key: &K) {
        self.slots.lock().remove(key);
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.slots.lock().clear();
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_loads_and_hit_skips_loader() {
        let cache: TtlCache<&str, u32> = TtlCache::new();
        let mut loads = 0;
        let v = cache.get_or_load("k", Duration::from_secs(60), || {
            loads += 1;
            7
        });
        assert_eq!(v, 7);
        let v = cache.get_or_load("k", Duration::from_secs(60), || {
            loads += 1;
            8
        });
        assert_eq!(v, 7);
        assert_eq!(loads, 1);
    }

    #[test]
    fn test_expired_entry_reloads() {
        let cache: TtlCache<&str, u32> = TtlCache::new();
        cache.get_or_load("k", Duration::ZERO, || 1);
        let v = cache.get_or_load("k", Duration::from_secs(60), || 2);
        assert_eq!(v, 2);
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let cache: TtlCache<&str, u32> = TtlCache::new();
        cache.get_or_load("k", Duration::from_secs(60), || 1);
        cache.invalidate(&"k");
        let v = cache.get_or_load("k", Duration::from_secs(60), || 2);
        assert_eq!(v, 2);
    }

    #[test]
    fn test_keys_are_independent() {
        let cache: TtlCache<(usize, u8), u32> = TtlCache::new();
        assert_eq!(cache.get_or_load((10, 0), Duration::from_secs(60), || 1), 1);
        assert_eq!(cache.get_or_load((10, 3), Duration::from_secs(60), || 2), 2);
        assert_eq!(cache.get_or_load((10, 0), Duration::from_secs(60), || 9), 1);
    }
}
