//! In-process TTL cache.

use super::CacheStore;
use crate::config::CacheSettings;
use moka::sync::Cache;
use std::time::Duration;

/// Bounded, time-to-live string cache for a single process.
///
/// Capacity eviction is approximate; expiry is exact at read time.
pub struct MemoryCache {
    entries: Cache<String, String>,
}

impl MemoryCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries.max(1) as u64)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(Duration::from_secs(settings.ttl_secs), settings.max_entries)
    }

    /// Number of live entries after pending maintenance has run.
    pub fn len(&self) -> usize {
        self.entries.run_pending_tasks();
        self.entries.entry_count() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key)
    }

    fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.invalidate(key);
    }
}
