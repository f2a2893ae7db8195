use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

/// Cached value with its wall-clock expiry
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Time-expiring cache of oracle responses keyed by query string.
///
/// Entries are never updated in place. An expired entry is dropped on the
/// read that finds it stale, and every insert sweeps out whatever else has
/// expired.
#[derive(Debug, Clone)]
pub struct ResponseCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl: Duration) -> Self {
        ResponseCache {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&mut self, key: String, value: V, now: DateTime<Utc>) {
        self.entries.retain(|_, entry| entry.expires_at > now);
        let expires_at = now + self.ttl;
        self.entries.insert(key, CacheEntry { value, expires_at });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
