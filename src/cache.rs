use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::metrics::{CACHE_HITS, CACHE_MISSES, CACHE_SIZE};
use crate::validation::ListingQuery;

// Cache entry with timestamp
#[derive(Clone)]
pub struct CacheEntry {
    pub body: String,
    pub created_at: Instant,
}

// Create a cache key (hash of the normalised search)
pub fn make_cache_key(query: &ListingQuery) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.cache_key_source());
    format!("{:x}", hasher.finalize())
}

/// TTL cache of serialized public listing searches.
///
/// Every invalidation bumps a generation counter. A body computed before
/// an invalidation is never stored after it.
pub struct ListingCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    generation: AtomicU64,
}

impl ListingCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            generation: AtomicU64::new(0),
        }
    }

    /// Read before computing a body that will be passed to [`insert`](Self::insert).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &str, now: Instant) -> Option<String> {
        if let Some(entry) = self.entries.get(key)
            && now.saturating_duration_since(entry.created_at) < self.ttl
        {
            CACHE_HITS.inc();
            return Some(entry.body.clone());
        }
        CACHE_MISSES.inc();
        None
    }

    /// Store `body` unless the cache was invalidated since `generation`
    /// was read. Returns whether it was stored.
    pub fn insert(&self, key: String, body: String, generation: u64) -> bool {
        if self.generation() != generation {
            return false;
        }
        self.entries.insert(
            key.clone(),
            CacheEntry {
                body,
                created_at: Instant::now(),
            },
        );
        // an invalidation may have raced the insert
        if self.generation() != generation {
            self.entries.remove(&key);
            return false;
        }
        CACHE_SIZE.set(self.entries.len() as f64);
        true
    }

    /// Drop everything; called after any listing write.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
        CACHE_SIZE.set(0.0);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
