//! Cache configuration
//!
//! Logical cache keys, their time-to-live, and the backend seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::EventType;
use crate::utils::errors::AppResult;

/// Derived views kept in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    EquipmentStatuses,
    EquipmentInfo,
    ActiveTrips,
    ZoneOptions,
    UserDirectory,
    MaintenanceLog,
}

impl CacheKey {
    pub const COUNT: usize = 6;

    pub const ALL: [CacheKey; CacheKey::COUNT] = [
        CacheKey::EquipmentStatuses,
        CacheKey::EquipmentInfo,
        CacheKey::ActiveTrips,
        CacheKey::ZoneOptions,
        CacheKey::UserDirectory,
        CacheKey::MaintenanceLog,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CacheKey::EquipmentStatuses => "equipmentStatuses",
            CacheKey::EquipmentInfo => "equipmentInfo",
            CacheKey::ActiveTrips => "activeTrips",
            CacheKey::ZoneOptions => "zoneOptions",
            CacheKey::UserDirectory => "userDirectory",
            CacheKey::MaintenanceLog => "maintenanceLog",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            CacheKey::EquipmentStatuses => 0,
            CacheKey::EquipmentInfo => 1,
            CacheKey::ActiveTrips => 2,
            CacheKey::ZoneOptions => 3,
            CacheKey::UserDirectory => 4,
            CacheKey::MaintenanceLog => 5,
        }
    }

    /// Keys derived from ledger records of this event type.
    pub fn invalidated_by(event: EventType) -> &'static [CacheKey] {
        match event {
            EventType::CheckOut | EventType::CheckIn => &[
                CacheKey::EquipmentStatuses,
                CacheKey::EquipmentInfo,
                CacheKey::ActiveTrips,
            ],
            EventType::MaintenanceStart | EventType::MaintenanceEnd | EventType::LocationUpdate => {
                &[CacheKey::EquipmentStatuses, CacheKey::EquipmentInfo]
            }
        }
    }
}

/// Cache settings. TTLs are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
    pub key_prefix: String,
    pub equipment_statuses_ttl: u64,
    pub equipment_info_ttl: u64,
    pub active_trips_ttl: u64,
    pub zone_options_ttl: u64,
    pub user_directory_ttl: u64,
    pub maintenance_log_ttl: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: "epj_tracker".to_string(),
            equipment_statuses_ttl: 21_600, // 6 hours
            equipment_info_ttl: 21_600,
            active_trips_ttl: 30, // dispatch needs fresh trips
            zone_options_ttl: 21_600,
            user_directory_ttl: 600,
            maintenance_log_ttl: 300,
        }
    }
}

impl CacheConfig {
    pub fn ttl_for(&self, key: CacheKey) -> u64 {
        match key {
            CacheKey::EquipmentStatuses => self.equipment_statuses_ttl,
            CacheKey::EquipmentInfo => self.equipment_info_ttl,
            CacheKey::ActiveTrips => self.active_trips_ttl,
            CacheKey::ZoneOptions => self.zone_options_ttl,
            CacheKey::UserDirectory => self.user_directory_ttl,
            CacheKey::MaintenanceLog => self.maintenance_log_ttl,
        }
    }

    pub fn storage_key(&self, key: CacheKey) -> String {
        format!("{}:{}", self.key_prefix, key.name())
    }
}

/// Cache backend.
///
/// Values are opaque JSON strings. A read past the TTL is a miss.
#[async_trait]
pub trait CacheOperations: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl_secs: u64) -> AppResult<()>;

    async fn delete(&self, keys: &[String]) -> AppResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttls() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl_for(CacheKey::EquipmentStatuses), 21_600);
        assert_eq!(config.ttl_for(CacheKey::ActiveTrips), 30);
        assert_eq!(config.ttl_for(CacheKey::MaintenanceLog), 300);
    }

    #[test]
    fn test_invalidation_map() {
        assert!(CacheKey::invalidated_by(EventType::CheckOut).contains(&CacheKey::ActiveTrips));
        assert!(CacheKey::invalidated_by(EventType::CheckIn).contains(&CacheKey::ActiveTrips));
        for event in [
            EventType::MaintenanceStart,
            EventType::MaintenanceEnd,
            EventType::LocationUpdate,
        ] {
            let keys = CacheKey::invalidated_by(event);
            assert!(keys.contains(&CacheKey::EquipmentStatuses));
            assert!(keys.contains(&CacheKey::EquipmentInfo));
            assert!(!keys.contains(&CacheKey::ActiveTrips));
        }
    }

    #[test]
    fn test_indices_are_distinct() {
        let mut seen = [false; CacheKey::COUNT];
        for key in CacheKey::ALL {
            assert!(!seen[key.index()]);
            seen[key.index()] = true;
        }
    }
}
