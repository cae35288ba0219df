//! Time-to-live response cache

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

/// Keyed cache whose entries expire after their own TTL.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            stored_at: Instant::now(),
            ttl,
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.into(), entry);
        }
    }

    /// Fresh value for `key`. Expired entries are evicted and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().ok()?;
        let entry = entries.get(key)?;

        if entry.stored_at.elapsed() > entry.ttl {
            entries.remove(key);
            return None;
        }

        Some(entry.value.clone())
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl() {
        let cache = TtlCache::new();
        cache.insert("stock-AAPL", 190.5, Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get("stock-AAPL"), Some(190.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_evicted() {
        let cache = TtlCache::new();
        cache.insert("news-data", "headlines".to_string(), Duration::from_secs(300));

        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(cache.get("news-data"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear() {
        let cache = TtlCache::new();
        cache.insert("a", 1, Duration::from_secs(10));
        cache.insert("b", 2, Duration::from_secs(10));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert_eq!(cache.get("a"), None);
    }
}
