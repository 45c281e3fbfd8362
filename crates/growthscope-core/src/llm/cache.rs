//! Completion response caching to reduce API calls

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

struct CacheEntry {
    value: String,
    expires_at: SystemTime,
}

/// In-memory TTL cache for serialized completion results
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl ResponseCache {
    /// Create new cache with default TTL of 1 hour
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(3600))
    }

    /// Create cache with custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl: ttl,
        }
    }

    /// Get cached value if present and not expired
    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;
        (SystemTime::now() < entry.expires_at).then(|| entry.value.clone())
    }

    /// Cache a value under the default TTL
    pub fn set(&self, key: String, value: String) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key,
                CacheEntry {
                    value,
                    expires_at: SystemTime::now() + self.default_ttl,
                },
            );
        }
    }

    /// Drop expired entries
    #[allow(dead_code)]
    pub fn cleanup(&self) {
        if let Ok(mut entries) = self.entries.write() {
            let now = SystemTime::now();
            entries.retain(|_, entry| now < entry.expires_at);
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate cache key for a completion call
pub fn completion_cache_key(model: &str, fingerprint: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    model.hash(&mut hasher);
    fingerprint.hash(&mut hasher);
    format!("completion:{}:{:x}", model, hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_basic() {
        let cache = ResponseCache::new();

        cache.set("key1".to_string(), "value1".to_string());
        assert_eq!(cache.get("key1"), Some("value1".to_string()));
        assert_eq!(cache.get("key2"), None);
    }

    #[test]
    fn test_cache_expiry() {
        let cache = ResponseCache::with_ttl(Duration::from_millis(50));

        cache.set("key1".to_string(), "value1".to_string());
        assert_eq!(cache.get("key1"), Some("value1".to_string()));

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(cache.get("key1"), None);
    }

    #[test]
    fn test_cache_key_generation() {
        let key1 = completion_cache_key("model1", "messages-a");
        let key2 = completion_cache_key("model1", "messages-a");
        let key3 = completion_cache_key("model1", "messages-b");

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
    }
}
