//! # In-Memory Record Cache
//!
//! A small TTL key/value store for computed records. Values are stored as
//! `serde_json::Value` so any serializable record (day records, phase reports)
//! can share one cache.
//!
//! ## Cache Strategy
//!
//! 1. **Check**: look the key up and drop it if its TTL has passed
//! 2. **Compute**: on a miss, run the computation
//! 3. **Store**: save the result with a fresh expiry; failures are not cached
//!
//! Expired entries are removed when looked up, and every insert sweeps the
//! whole map once the sweep interval (an hour by default) has passed since
//! the previous sweep, so keys that are never read again do not pile up.
//!
//! Results are deterministic for a given key, so a hit is always equivalent to
//! recomputing. The cache never changes what a caller sees, only how fast.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often inserts sweep out expired entries by default.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    /// `None` when the TTL reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

#[derive(Debug)]
struct Store {
    entries: HashMap<String, Entry>,
    last_sweep: Instant,
}

impl Store {
    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(now));
        self.last_sweep = now;
        before - self.entries.len()
    }
}

/// Thread-safe TTL cache keyed by string.
#[derive(Debug)]
pub struct MemoryCache {
    store: Mutex<Store>,
    sweep_interval: Duration,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose inserts sweep expired entries at most once per `interval`.
    /// `Duration::ZERO` sweeps on every insert.
    pub fn with_sweep_interval(interval: Duration) -> Self {
        MemoryCache {
            store: Mutex::new(Store {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            sweep_interval: interval,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        // A panic while holding the lock cannot leave an entry half-written
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fresh value for `key`, removing it if it has expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut store = self.lock();
        match store.entries.get(key) {
            Some(entry) if entry.is_fresh(now) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }
        store.entries.remove(key);
        None
    }

    /// Store `value` for `ttl`. A TTL too large to represent never expires.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let now = Instant::now();
        let entry = Entry {
            value,
            expires_at: now.checked_add(ttl),
        };
        let mut store = self.lock();
        if now.saturating_duration_since(store.last_sweep) >= self.sweep_interval {
            let removed = store.sweep(now);
            if removed > 0 {
                debug!(removed, "swept expired cache entries");
            }
        }
        store.entries.insert(key.into(), entry);
    }

    pub fn delete(&self, key: &str) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Drop all expired entries now; returns how many were removed.
    pub fn cleanup(&self) -> usize {
        self.lock().sweep(Instant::now())
    }

    /// Number of stored entries, expired ones included until the next
    /// sweep or lookup.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached `T` for `key`, or compute, store and return it.
    ///
    /// A stored value that no longer deserializes as `T` is treated as a miss.
    /// Errors from `compute` are returned unchanged and nothing is stored.
    pub fn get_or_insert_with<T, E, F>(&self, key: &str, ttl: Duration, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get(key) {
            match serde_json::from_value::<T>(value) {
                Ok(hit) => {
                    debug!(key, "cache hit");
                    return Ok(hit);
                }
                Err(e) => warn!(key, error = %e, "discarding unreadable cache entry"),
            }
        }

        let fresh = compute()?;
        match serde_json::to_value(&fresh) {
            Ok(value) => self.set(key, value, ttl),
            Err(e) => warn!(key, error = %e, "record not cacheable"),
        }
        Ok(fresh)
    }
}

/// Cache key for a date, optionally scoped to a location rounded to 0.01°.
///
/// `moon:2025-01-01` or `moon:2025-01-01:52.52:13.40`.
pub fn moon_cache_key(date: chrono::NaiveDate, location: Option<(f64, f64)>) -> String {
    let day = date.format("%Y-%m-%d");
    match location {
        Some((lat, lon)) => format!("moon:{day}:{lat:.2}:{lon:.2}"),
        None => format!("moon:{day}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_set_get_delete() {
        let cache = MemoryCache::new();
        assert!(cache.is_empty());
        cache.set("a", json!({"x": 1}), Duration::from_secs(60));
        assert_eq!(cache.get("a"), Some(json!({"x": 1})));
        assert_eq!(cache.len(), 1);
        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = MemoryCache::new();
        cache.set("gone", json!(1), Duration::ZERO);
        cache.set("kept", json!(2), Duration::from_secs(3600));
        assert_eq!(cache.get("gone"), None);
        assert_eq!(cache.len(), 1);

        cache.set("gone-too", json!(3), Duration::ZERO);
        assert_eq!(cache.cleanup(), 1);
        assert_eq!(cache.get("kept"), Some(json!(2)));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unbounded_ttl_never_expires() {
        let cache = MemoryCache::new();
        cache.set("forever", json!(true), Duration::from_secs(u64::MAX));
        cache.set("also", json!(1), Duration::MAX);
        assert_eq!(cache.get("forever"), Some(json!(true)));
        assert_eq!(cache.cleanup(), 0);
        assert_eq!(cache.len(), 2);

        let value: Result<u32, ()> =
            cache.get_or_insert_with("computed", Duration::from_secs(u64::MAX), || Ok(5));
        assert_eq!(value, Ok(5));
        assert_eq!(cache.get("computed"), Some(json!(5)));
    }

    #[test]
    fn test_inserts_sweep_expired_keys() {
        let cache = MemoryCache::with_sweep_interval(Duration::ZERO);
        cache.set("kept", json!(0), Duration::from_secs(3600));
        for day in 1..=20 {
            cache.set(format!("moon:2025-01-{day:02}"), json!(day), Duration::ZERO);
        }
        // Only the long-lived key and the latest insert remain
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("kept"), Some(json!(0)));
    }

    #[test]
    fn test_sweep_waits_for_interval() {
        let cache = MemoryCache::with_sweep_interval(Duration::from_secs(3600));
        for day in 1..=20 {
            cache.set(format!("moon:2025-01-{day:02}"), json!(day), Duration::ZERO);
        }
        assert_eq!(cache.len(), 20);
        assert_eq!(cache.cleanup(), 20);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_or_insert_with_computes_once() {
        let cache = MemoryCache::new();
        let mut calls = 0;
        let first: Result<Vec<u32>, String> =
            cache.get_or_insert_with("k", Duration::from_secs(60), || {
                calls += 1;
                Ok(vec![1, 2, 3])
            });
        let second: Result<Vec<u32>, String> =
            cache.get_or_insert_with("k", Duration::from_secs(60), || {
                calls += 1;
                Ok(vec![9])
            });
        assert_eq!(first.unwrap(), vec![1, 2, 3]);
        assert_eq!(second.unwrap(), vec![1, 2, 3]);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = MemoryCache::new();
        let failed: Result<u32, &str> =
            cache.get_or_insert_with("k", Duration::from_secs(60), || Err("boom"));
        assert_eq!(failed, Err("boom"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_type_mismatch_is_a_miss() {
        let cache = MemoryCache::new();
        cache.set("k", json!("not a number"), Duration::from_secs(60));
        let value: Result<u32, ()> = cache.get_or_insert_with("k", Duration::from_secs(60), || Ok(7));
        assert_eq!(value, Ok(7));
        assert_eq!(cache.get("k"), Some(json!(7)));
    }

    #[test]
    fn test_cache_key_format() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(moon_cache_key(date, None), "moon:2025-01-01");
        assert_eq!(
            moon_cache_key(date, Some((52.5201, 13.4061))),
            "moon:2025-01-01:52.52:13.41"
        );
        assert_eq!(
            moon_cache_key(date, Some((-33.8688, 151.2093))),
            "moon:2025-01-01:-33.87:151.21"
        );
    }
}
