// src/services/cache.rs
// DOCUMENTATION: In-memory cache for public search responses
// PURPOSE: Serve repeated place searches without hitting the database

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct CachedSearch {
    json: String,
    stored_at: Instant,
}

/// Serialized search responses keyed by `SearchQuery::cache_key`
/// DOCUMENTATION: Every entry shares one TTL. Any write to places, reviews
/// or photos clears the whole cache, so entries never outlive a change.
pub struct SearchCache {
    entries: RwLock<HashMap<String, CachedSearch>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Snapshot reported on the admin dashboard
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub expired: usize,
    pub hits: u64,
    pub misses: u64,
    pub ttl_seconds: u64,
}

impl SearchCache {
    pub fn new(ttl_seconds: u64) -> Self {
        Self::with_ttl(Duration::from_secs(ttl_seconds))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn is_fresh(&self, entry: &CachedSearch) -> bool {
        entry.stored_at.elapsed() < self.ttl
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        let found = entries
            .get(key)
            .filter(|e| self.is_fresh(e))
            .map(|e| e.json.clone());

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Search cache hit: {}", key);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            log::debug!("Search cache miss: {}", key);
        }
        found
    }

    pub async fn set(&self, key: String, json: String) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CachedSearch {
                json,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop expired entries, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        let removed = before - entries.len();

        if removed > 0 {
            log::debug!(
                "Search cache purge: {} expired, {} remaining",
                removed,
                entries.len()
            );
        }
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        CacheStats {
            entries: entries.len(),
            expired: entries.values().filter(|e| !self.is_fresh(e)).count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ttl_seconds: self.ttl.as_secs(),
        }
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        log::info!("Search cache cleared: {} entries removed", count);
    }
}

/// Periodically purge expired search responses
pub fn start_cleanup_task(cache: Arc<SearchCache>, interval_seconds: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));

        loop {
            interval.tick().await;
            cache.purge_expired().await;
        }
    });
}
