//! In-process cache backend
//!
//! Entries carry their own deadline. Expired entries read as misses and are
//! swept on the next write.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use super::CacheOperations;
use crate::utils::errors::AppResult;

/// In-process cache backend with per-entry deadlines.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheOperations for MemoryCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((value, deadline)) if *deadline > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                debug!("⏰ Cache entry expired: {}", key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> AppResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, deadline)| *deadline > now);
        entries.insert(key.to_string(), (value, now + Duration::from_secs(ttl_secs)));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();
        cache.set("a", "1".to_string(), 60).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), Some("1".to_string()));

        cache.delete(&["a".to_string()]).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_a_miss() {
        let cache = MemoryCache::new();
        cache.set("a", "1".to_string(), 0).await.unwrap();
        assert_eq!(cache.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_writes_sweep_expired_entries() {
        let cache = MemoryCache::new();
        cache.set("stale", "1".to_string(), 0).await.unwrap();
        cache.set("fresh", "2".to_string(), 60).await.unwrap();

        let entries = cache.entries.read().await;
        assert!(!entries.contains_key("stale"));
        assert!(entries.contains_key("fresh"));
    }
}
