//! TTL cache shared by every analyzer, with an optional JSON snapshot on disk
//! so entries outlive a single process.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::AnalysisError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Expiry stays within a century so snapshots keep four-digit years.
fn expiry_after(ttl: Duration) -> DateTime<Utc> {
    let max_ttl = chrono::Duration::days(36_500);
    let ttl = chrono::Duration::from_std(ttl).unwrap_or(max_ttl).min(max_ttl);
    Utc::now() + ttl
}

/// Entry counts reported by [`ResponseCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
}

/// Key/value store with a per-entry expiry. Values are stored as JSON so any
/// serializable result can be cached under an opaque string key.
///
/// Expired entries are evicted when they are read; [`ResponseCache::purge_expired`]
/// reclaims the rest. Concurrent writers to the same key are last-writer-wins.
/// Expiry is wall-clock time so a snapshot written by [`ResponseCache::save`]
/// stays meaningful when [`ResponseCache::load`]ed by a later process.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a snapshot written by [`ResponseCache::save`], dropping entries
    /// that expired in the meantime. A missing or unreadable file is an empty cache.
    pub fn load(path: &Path) -> Self {
        let cache = Self::new();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return cache,
            Err(e) => {
                tracing::warn!("Could not read cache file {}: {}", path.display(), e);
                return cache;
            }
        };

        let snapshot: HashMap<String, CacheEntry> = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Ignoring corrupt cache file {}: {}", path.display(), e);
                return cache;
            }
        };

        let now = Utc::now();
        for (key, entry) in snapshot.into_iter().filter(|(_, e)| !e.is_expired(now)) {
            cache.entries.insert(key, entry);
        }
        tracing::debug!("Loaded {} cache entries from {}", cache.len(), path.display());
        cache
    }

    /// Purge expired entries, then write the rest to `path` through a temp
    /// file. Returns the number of entries written.
    pub fn save(&self, path: &Path) -> Result<usize, AnalysisError> {
        self.purge_expired();

        let snapshot: HashMap<String, CacheEntry> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let json = serde_json::to_string(&snapshot)
            .map_err(|e| AnalysisError::CacheError(format!("serialize snapshot: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AnalysisError::CacheError(format!("create {}: {}", parent.display(), e)))?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| AnalysisError::CacheError(format!("write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| AnalysisError::CacheError(format!("replace {}: {}", path.display(), e)))?;

        tracing::debug!("Saved {} cache entries to {}", snapshot.len(), path.display());
        Ok(snapshot.len())
    }

    /// Store `value` under `key` until `ttl` elapses. Returns `false` when the
    /// value could not be serialized; the key is then left untouched.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Cache write failed for {}: {}", key, e);
                return false;
            }
        };

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: expiry_after(ttl),
            },
        );
        true
    }

    /// Fetch an unexpired value. Missing, expired, or undecodable entries all read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = Utc::now();
        let value = {
            let entry = self.entries.get(key)?;
            if entry.is_expired(now) {
                None
            } else {
                Some(entry.value.clone())
            }
        };

        let Some(value) = value else {
            self.entries.remove_if(key, |_, e| e.is_expired(now));
            return None;
        };

        match serde_json::from_value(value) {
            Ok(v) => {
                tracing::debug!("Cache hit: {}", key);
                Some(v)
            }
            Err(e) => {
                tracing::debug!("Cache entry {} did not decode: {}", key, e);
                None
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!("Purged {} expired cache entries", removed);
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including ones that have expired but not yet been evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let total_entries = self.entries.len();
        let expired_entries = self.entries.iter().filter(|e| e.is_expired(now)).count();
        CacheStats {
            total_entries,
            valid_entries: total_entries.saturating_sub(expired_entries),
            expired_entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Quote;
    use std::collections::BTreeMap;

    fn quote(price: f64) -> Quote {
        Quote {
            symbol: "AAPL".to_string(),
            price,
            change: 1.0,
            change_percent: 0.5,
            volume: None,
            high: None,
            low: None,
            open: None,
            previous_close: None,
        }
    }

    #[test]
    fn test_set_then_get() {
        let cache = ResponseCache::new();
        assert!(cache.set("quote:AAPL", &quote(150.0), Duration::from_secs(60)));

        let cached: Option<Quote> = cache.get("quote:AAPL");
        assert_eq!(cached.map(|q| q.price), Some(150.0));
    }

    #[test]
    fn test_missing_key_is_absent() {
        let cache = ResponseCache::new();
        let cached: Option<Quote> = cache.get("quote:MSFT");
        assert!(cached.is_none());
    }

    #[test]
    fn test_expired_entry_reads_absent_and_is_evicted() {
        let cache = ResponseCache::new();
        cache.set("k", &42_i32, Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.get::<i32>("k"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let cache = ResponseCache::new();
        cache.set("k", &"v", Duration::ZERO);
        assert_eq!(cache.get::<String>("k"), None);
    }

    #[test]
    fn test_type_mismatch_is_a_miss() {
        let cache = ResponseCache::new();
        cache.set("k", &"not a number", Duration::from_secs(60));
        assert_eq!(cache.get::<f64>("k"), None);
        // the entry itself is still there for a reader expecting a string
        assert_eq!(cache.get::<String>("k").as_deref(), Some("not a number"));
    }

    #[test]
    fn test_unserializable_value_is_not_cached() {
        // JSON object keys must be strings
        let mut bad: BTreeMap<(i32, i32), i32> = BTreeMap::new();
        bad.insert((1, 2), 3);

        let cache = ResponseCache::new();
        assert!(!cache.set("bad", &bad, Duration::from_secs(60)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_last_writer_wins() {
        let cache = ResponseCache::new();
        cache.set("k", &1, Duration::from_secs(60));
        cache.set("k", &2, Duration::from_secs(60));
        assert_eq!(cache.get::<i32>("k"), Some(2));
    }

    #[test]
    fn test_purge_and_stats() {
        let cache = ResponseCache::new();
        cache.set("fresh", &1, Duration::from_secs(60));
        cache.set("stale-a", &2, Duration::ZERO);
        cache.set("stale-b", &3, Duration::ZERO);

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.valid_entries, 1);
        assert_eq!(stats.expired_entries, 2);

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);

        assert!(cache.remove("fresh"));
        assert!(!cache.remove("fresh"));
        cache.set("again", &4, Duration::from_secs(60));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("responses.json");

        let cache = ResponseCache::new();
        cache.set("quote:AAPL", &quote(150.0), Duration::ZERO);
        cache.set("quote:last:AAPL", &quote(150.0), Duration::from_secs(24 * 3600));
        assert_eq!(cache.save(&path).unwrap(), 1);

        let reloaded = ResponseCache::load(&path);
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.get::<Quote>("quote:AAPL").is_none());
        let last: Option<Quote> = reloaded.get("quote:last:AAPL");
        assert_eq!(last.map(|q| q.price), Some(150.0));
        assert_eq!(reloaded.stats().valid_entries, 1);
    }

    #[test]
    fn test_unreadable_snapshot_is_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ResponseCache::load(&dir.path().join("missing.json")).is_empty());

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "{not json").unwrap();
        assert!(ResponseCache::load(&corrupt).is_empty());
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("responses.json");

        let cache = ResponseCache::new();
        cache.set("forever", &1, Duration::MAX);
        assert_eq!(cache.get::<i32>("forever"), Some(1));
        cache.save(&path).unwrap();
        assert_eq!(ResponseCache::load(&path).get::<i32>("forever"), Some(1));
    }
}
