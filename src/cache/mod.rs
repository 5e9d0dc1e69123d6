//! Cache
//!
//! Projection cache and its storage backends.

pub mod cache_config;
pub mod memory_cache;
pub mod projection_cache;
pub mod redis_client;

pub use cache_config::{CacheConfig, CacheKey, CacheOperations};
pub use memory_cache::MemoryCache;
pub use projection_cache::ProjectionCache;
pub use redis_client::RedisClient;
