//! Recommendation cache.
//!
//! The global-recommendation tier scans up to 200 session records per call;
//! this cache memoizes its result per (kind, grade, subject) context for a
//! bounded time. The cache is an explicit object owned by the selector, with
//! TTL-checked reads and writes; there is no ambient static state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::model::TaskKind;

/// Hit/miss counters for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    combo_name: String,
    inserted_at: Instant,
}

/// TTL-bounded map from selection context to a recommended combo name.
pub struct RecommendationCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    max_entries: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RecommendationCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Stable cache key for a selection context.
    pub fn context_key(kind: TaskKind, grade: &str, subject: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(grade.as_bytes());
        hasher.update(b"|");
        hasher.update(subject.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns the cached combo name if present and not expired.
    pub fn get(&self, key: &str) -> Option<String> {
        {
            let entries = self.entries.read().expect("cache lock poisoned");
            if let Some(entry) = entries.get(key) {
                if entry.inserted_at.elapsed() < self.ttl {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.combo_name.clone());
                }
            }
        }

        // Expired entries are removed on the read path so the map does not
        // accumulate stale contexts between writes.
        let mut entries = self.entries.write().expect("cache lock poisoned");
        if let Some(entry) = entries.get(key) {
            if entry.inserted_at.elapsed() >= self.ttl {
                entries.remove(key);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores a recommendation, evicting the oldest entry when full.
    pub fn put(&self, key: impl Into<String>, combo_name: impl Into<String>) {
        let mut entries = self.entries.write().expect("cache lock poisoned");

        if entries.len() >= self.max_entries {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key.into(),
            CacheEntry {
                combo_name: combo_name.into(),
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
