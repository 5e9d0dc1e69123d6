//! Environment configuration
//!
//! Every setting comes from the environment (after `.env` is loaded) and has
//! a default. Unparseable values fail at boot.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

use crate::cache::CacheConfig;
use crate::services::geofence::Geofence;

#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub log_level: Level,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub lock_timeout: Duration,
    pub session_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub geofence: Geofence,
    /// Empty means permissive CORS.
    pub cors_origins: Vec<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: Level::INFO,
            database_url: None,
            redis_url: None,
            lock_timeout: Duration::from_secs(30),
            session_ttl_hours: 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            geofence: Geofence::default(),
            cors_origins: Vec::new(),
        }
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(name) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} must be valid, got '{}'", name, raw)),
        None => Ok(default),
    }
}

impl EnvironmentConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let fence = defaults.geofence;

        Ok(Self {
            environment: optional("ENVIRONMENT").unwrap_or(defaults.environment),
            host: optional("HOST").unwrap_or(defaults.host),
            port: parsed("PORT", defaults.port)?,
            log_level: parse_level(optional("LOG_LEVEL"))?,
            database_url: optional("DATABASE_URL"),
            redis_url: optional("REDIS_URL"),
            lock_timeout: Duration::from_secs(parsed("LOCK_TIMEOUT_SECS", defaults.lock_timeout.as_secs())?),
            session_ttl_hours: parsed("SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
            bcrypt_cost: parsed("BCRYPT_COST", defaults.bcrypt_cost)?,
            geofence: Geofence {
                latitude: parsed("WAREHOUSE_LAT", fence.latitude)?,
                longitude: parsed("WAREHOUSE_LON", fence.longitude)?,
                radius_meters: parsed("GEOFENCE_RADIUS_METERS", fence.radius_meters)?,
            },
            cors_origins: optional("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            redis_url: self.redis_url.clone(),
            ..CacheConfig::default()
        }
    }
}

fn parse_level(raw: Option<String>) -> Result<Level> {
    match raw {
        Some(raw) => Level::from_str(&raw).with_context(|| format!("LOG_LEVEL must be a tracing level, got '{}'", raw)),
        None => Ok(Level::INFO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EnvironmentConfig::default();
        assert_eq!(config.server_url(), "0.0.0.0:3000");
        assert_eq!(config.lock_timeout, Duration::from_secs(30));
        assert!(config.is_development());
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level(Some("debug".to_string())).unwrap(), Level::DEBUG);
        assert_eq!(parse_level(None).unwrap(), Level::INFO);
        assert!(parse_level(Some("loud".to_string())).is_err());
    }
}
