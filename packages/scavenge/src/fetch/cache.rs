//! TTL cache for page fetch results.
//!
//! Keyed by normalized URL. Failed fetches are cached too, so a dead
//! URL costs one retry cycle per TTL window instead of one per tool
//! call.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use crate::config::CachePolicy;
use crate::types::PageFetchResult;

struct CacheEntry {
    result: PageFetchResult,
    inserted_at: Instant,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
}

/// In-memory fetch cache with TTL expiry and oldest-first eviction.
pub struct FetchCache {
    policy: CachePolicy,
    inner: Mutex<CacheInner>,
}

impl FetchCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                hits: 0,
            }),
        }
    }

    /// Look up a fresh entry. Expired entries are dropped on the way.
    pub fn get(&self, url: &str) -> Option<PageFetchResult> {
        let mut inner = self.inner.lock().unwrap();

        let fresh = match inner.entries.get(url) {
            Some(entry) => entry.inserted_at.elapsed() < self.policy.ttl,
            None => return None,
        };
        if !fresh {
            inner.entries.remove(url);
            return None;
        }

        inner.hits += 1;
        inner.entries.get(url).map(|e| e.result.clone())
    }

    /// Store a result, evicting the oldest-inserted entry when full.
    pub fn insert(&self, url: impl Into<String>, result: PageFetchResult) {
        let url = url.into();
        let mut inner = self.inner.lock().unwrap();

        if inner.entries.len() >= self.policy.max_entries && !inner.entries.contains_key(&url) {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(key) = oldest {
                inner.entries.remove(&key);
            }
        }

        inner.entries.insert(
            url,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Cache hits served so far.
    pub fn hits(&self) -> u64 {
        self.inner.lock().unwrap().hits
    }

    /// Live entry count (expired entries linger until touched).
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
