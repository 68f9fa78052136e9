//! Short-TTL cache for read endpoints.
//!
//! Entries are keyed by path plus sorted query pairs and live for a fixed
//! TTL. Mutations never touch the cache, so a read issued within the TTL
//! of a previous identical read can return stale data. That trade is
//! intentional: the server is the source of truth and the window is short.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default lifetime of a cached read.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(120);

/// Entry count that triggers a sweep of expired entries on insert.
const SWEEP_THRESHOLD: usize = 64;

#[derive(Debug)]
struct CacheEntry {
    stored_at: Instant,
    body: Value,
}

/// TTL-bound response cache shared by all read calls of one client.
#[derive(Debug)]
pub struct ReadCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ReadCache {
    pub fn new(ttl: Duration) -> Self {
        ReadCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Returns the cached body for `key` if it is still within its TTL.
    ///
    /// Expired entries are dropped on access.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.body.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores a response body, replacing any previous entry for `key`.
    pub fn put(&self, key: String, body: Value) {
        let mut entries = self.lock();
        if entries.len() >= SWEEP_THRESHOLD {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        }
        entries.insert(
            key,
            CacheEntry {
                stored_at: Instant::now(),
                body,
            },
        );
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds the cache key for a path and its query pairs.
///
/// Pairs are sorted so parameter order never splits the cache.
pub fn cache_key(path: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let mut pairs: Vec<&(String, String)> = query.iter().collect();
    pairs.sort();

    let mut key = String::from(path);
    for (i, (name, value)) in pairs.iter().enumerate() {
        key.push(if i == 0 { '?' } else { '&' });
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}
