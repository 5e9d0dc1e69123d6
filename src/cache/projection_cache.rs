//! Projection cache
//!
//! Typed memoization of ledger projections over any `CacheOperations`
//! backend. Each logical key has an epoch that every invalidation bumps. A
//! reader that recomputed while an invalidation ran drops the entry it just
//! wrote, so a projection taken from a pre-write snapshot cannot outlive the
//! write.

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{CacheConfig, CacheKey, CacheOperations, MemoryCache};
use crate::models::EventType;
use crate::utils::errors::AppResult;

#[derive(Clone)]
pub struct ProjectionCache {
    backend: Arc<dyn CacheOperations>,
    config: Arc<CacheConfig>,
    epochs: Arc<[AtomicU64; CacheKey::COUNT]>,
}

impl ProjectionCache {
    pub fn new(backend: Arc<dyn CacheOperations>, config: CacheConfig) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            epochs: Arc::new(Default::default()),
        }
    }

    pub fn in_memory(config: CacheConfig) -> Self {
        Self::new(Arc::new(MemoryCache::new()), config)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn epoch(&self, key: CacheKey) -> u64 {
        self.epochs[key.index()].load(Ordering::SeqCst)
    }

    /// Cached value for `key`, or the result of `compute` which is then
    /// stored with the key's TTL.
    pub async fn get_or_compute<T, F, Fut>(&self, key: CacheKey, compute: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let storage_key = self.config.storage_key(key);

        match self.backend.get(&storage_key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    debug!("🎯 Cache hit: {}", key.name());
                    return Ok(value);
                }
                Err(e) => warn!("⚠️ Discarding unreadable cache entry {}: {}", key.name(), e),
            },
            Ok(None) => debug!("🔍 Cache miss: {}", key.name()),
            Err(e) => warn!("⚠️ Cache read failed for {}, recomputing: {}", key.name(), e),
        }

        let epoch = self.epoch(key);
        let value = compute().await?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = self
                    .backend
                    .set(&storage_key, raw, self.config.ttl_for(key))
                    .await
                {
                    warn!("⚠️ Cache write failed for {}: {}", key.name(), e);
                }
            }
            Err(e) => warn!("⚠️ Could not serialize {} for caching: {}", key.name(), e),
        }

        if self.epoch(key) != epoch {
            debug!("🔄 {} invalidated during recompute, dropping entry", key.name());
            if let Err(e) = self.backend.delete(&[storage_key]).await {
                warn!("⚠️ Cache delete failed for {}: {}", key.name(), e);
            }
        }

        Ok(value)
    }

    pub async fn invalidate(&self, keys: &[CacheKey]) {
        if keys.is_empty() {
            return;
        }
        for key in keys {
            self.epochs[key.index()].fetch_add(1, Ordering::SeqCst);
        }
        let storage_keys: Vec<String> = keys.iter().map(|k| self.config.storage_key(*k)).collect();
        match self.backend.delete(&storage_keys).await {
            Ok(()) => debug!("🗑️ Invalidated {:?}", keys.iter().map(|k| k.name()).collect::<Vec<_>>()),
            Err(e) => warn!("⚠️ Cache invalidation failed for {:?}: {}", storage_keys, e),
        }
    }

    /// Invalidate every key derived from records of the given event types.
    pub async fn invalidate_for_events(&self, events: &[EventType]) {
        let mut keys: Vec<CacheKey> = Vec::new();
        for event in events {
            for key in CacheKey::invalidated_by(*event) {
                if !keys.contains(key) {
                    keys.push(*key);
                }
            }
        }
        self.invalidate(&keys).await;
    }
}
