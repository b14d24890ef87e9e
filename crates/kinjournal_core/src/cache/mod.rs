//! String-keyed cache used in front of SQLite reads.
//!
//! # Responsibility
//! - Define the [`CacheStore`] seam (a distributed cache in production, an
//!   in-process map by default).
//! - Provide read-through/write-through helpers shared by every repository.
//!
//! # Invariants
//! - Values are JSON documents; an undecodable value is dropped and treated
//!   as a miss, never surfaced as an error.
//! - Writes are last-write-wins; no version checks are made.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

mod cached_repo;
mod memory;

pub use cached_repo::{CachedRepository, CachedTimeline};
pub use memory::MemoryCache;

/// Key/value cache abstraction.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

pub(crate) fn item_key(table: &str, id: i64) -> String {
    format!("{table}:{id}")
}

pub(crate) fn progeny_list_key(table: &str, progeny_id: i64) -> String {
    format!("{table}:progeny:{progeny_id}")
}

/// Returns the cached value for `key`, or loads it and caches the result.
pub(crate) fn read_through<T, E>(
    cache: &dyn CacheStore,
    key: &str,
    load: impl FnOnce() -> Result<Option<T>, E>,
) -> Result<Option<T>, E>
where
    T: Serialize + DeserializeOwned,
{
    if let Some(raw) = cache.get(key) {
        match serde_json::from_str::<T>(&raw) {
            Ok(value) => return Ok(Some(value)),
            Err(err) => {
                warn!("event=cache_decode_failed module=cache status=miss key={key} error={err}");
                cache.remove(key);
            }
        }
    }

    debug!("event=cache_miss module=cache status=load key={key}");
    let loaded = load()?;
    if let Some(value) = &loaded {
        write_through(cache, key, value);
    }
    Ok(loaded)
}

/// Serializes `value` into the cache under `key`.
pub(crate) fn write_through<T: Serialize>(cache: &dyn CacheStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => cache.set(key, raw),
        Err(err) => {
            warn!("event=cache_encode_failed module=cache status=skip key={key} error={err}");
            cache.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{read_through, CacheStore, MemoryCache};
    use std::cell::Cell;
    use std::time::Duration;

    #[test]
    fn read_through_loads_once_then_serves_cache() {
        let cache = MemoryCache::new(Duration::from_secs(60), 16);
        let loads = Cell::new(0);
        let load = || -> Result<Option<Vec<i64>>, ()> {
            loads.set(loads.get() + 1);
            Ok(Some(vec![1, 2, 3]))
        };

        let first = read_through(&cache, "k", load).unwrap();
        let second = read_through(&cache, "k", || -> Result<Option<Vec<i64>>, ()> {
            loads.set(loads.get() + 1);
            Ok(None)
        })
        .unwrap();

        assert_eq!(first, Some(vec![1, 2, 3]));
        assert_eq!(second, Some(vec![1, 2, 3]));
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn undecodable_payload_is_treated_as_miss() {
        let cache = MemoryCache::new(Duration::from_secs(60), 16);
        cache.set("k", "{not json".to_string());

        let value = read_through(&cache, "k", || -> Result<Option<i64>, ()> { Ok(Some(7)) })
            .unwrap();
        assert_eq!(value, Some(7));
        assert_eq!(cache.get("k").as_deref(), Some("7"));
    }

    #[test]
    fn missing_values_are_not_cached() {
        let cache = MemoryCache::new(Duration::from_secs(60), 16);
        let value = read_through(&cache, "k", || -> Result<Option<i64>, ()> { Ok(None) })
            .unwrap();
        assert_eq!(value, None);
        assert!(cache.get("k").is_none());
    }
}
