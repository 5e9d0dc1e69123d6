use anyhow::Result;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, RedisResult};
use tracing::{debug, info, warn};

use super::CacheOperations;
use crate::utils::errors::{AppError, AppResult};

/// Redis backend over a multiplexed, auto-reconnecting connection.
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
}

impl RedisClient {
    /// Connect and verify the server answers `PING`.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        info!("🔗 Connecting to Redis: {}", redis_url);

        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;

        let mut conn = manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;

        info!("✅ Redis connected");
        Ok(Self { manager })
    }
}

fn cache_error(e: redis::RedisError) -> AppError {
    AppError::Cache(e.to_string())
}

#[async_trait]
impl CacheOperations for RedisClient {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await.map_err(cache_error)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> AppResult<()> {
        // Redis rejects EX 0; an already-expired entry is simply not written.
        if ttl_secs == 0 {
            return Ok(());
        }
        let mut conn = self.manager.clone();

        let result: RedisResult<()> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await;

        match result {
            Ok(()) => {
                debug!("💾 Redis SET {} (TTL: {}s)", key, ttl_secs);
                Ok(())
            }
            Err(e) => {
                warn!("⚠️ Redis SET failed for {}: {}", key, e);
                Err(cache_error(e))
            }
        }
    }

    async fn delete(&self, keys: &[String]) -> AppResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.manager.clone();
        let removed: i64 = conn.del(keys).await.map_err(cache_error)?;
        debug!("🗑️ Redis DEL {:?} (removed: {})", keys, removed);
        Ok(())
    }
}
