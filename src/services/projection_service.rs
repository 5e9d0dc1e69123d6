//! Projection service
//!
//! Every read of derived state goes through here: the projection cache first,
//! then a recompute from the stores on a miss.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use super::active_trip_index::ActiveTripIndex;
use super::status_projector;
use crate::cache::{CacheKey, ProjectionCache};
use crate::models::{
    ActiveTrip, EquipmentInfo, EquipmentOverview, EquipmentState, EquipmentStatus,
    EquipmentStatusView, EquipmentUnit, MaintenanceLogEntry, UserDirectory, UserSummary,
};
use crate::repositories::Repositories;
use crate::utils::errors::AppResult;

/// Maintenance entries shown on the dashboard.
pub const DASHBOARD_MAINTENANCE_ENTRIES: usize = 20;

/// Carrier shown for a checkout whose driver is not in the directory.
pub const UNKNOWN_CARRIER: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveDriver {
    pub username: String,
    pub display_name: String,
}

/// Active trip joined with the driver's carrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveCheckout {
    #[serde(flatten)]
    pub trip: ActiveTrip,
    pub carrier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub equipment_statuses: Vec<EquipmentStatusView>,
    pub users: Vec<UserSummary>,
    pub maintenance_log: Vec<MaintenanceLogEntry>,
    pub active_checkouts: Vec<ActiveCheckout>,
}

#[derive(Clone)]
pub struct ProjectionService {
    repos: Repositories,
    cache: ProjectionCache,
}

impl ProjectionService {
    pub fn new(repos: Repositories, cache: ProjectionCache) -> Self {
        Self { repos, cache }
    }

    pub fn cache(&self) -> &ProjectionCache {
        &self.cache
    }

    async fn project_states(&self) -> AppResult<(Vec<EquipmentUnit>, HashMap<String, EquipmentState>)> {
        let units = self.repos.equipment.list_equipment().await?;
        let ids: Vec<String> = units.iter().map(|u| u.equipment_id.clone()).collect();
        let records = self.repos.ledger.records().await?;
        let states = status_projector::project(&records, &ids);
        debug!("🔍 Projected {} units over {} ledger records", ids.len(), records.len());
        Ok((units, states))
    }

    /// Status of every registered unit, in registry order.
    pub async fn equipment_statuses(&self) -> AppResult<Vec<EquipmentStatusView>> {
        self.cache
            .get_or_compute(CacheKey::EquipmentStatuses, move || async move {
                let (units, states) = self.project_states().await?;
                let views: Vec<EquipmentStatusView> = units
                    .iter()
                    .map(|unit| EquipmentStatusView {
                        equipment_id: unit.equipment_id.clone(),
                        status: states
                            .get(&unit.equipment_id)
                            .map(|s| s.status)
                            .unwrap_or_default(),
                        store_only: unit.store_only,
                    })
                    .collect();

                let stale: Vec<(String, EquipmentStatus)> = units
                    .iter()
                    .zip(&views)
                    .filter(|(unit, view)| unit.status != view.status)
                    .map(|(_, view)| (view.equipment_id.clone(), view.status))
                    .collect();
                if !stale.is_empty() {
                    if let Err(e) = self.repos.equipment.update_advisory_statuses(&stale).await {
                        warn!("⚠️ Could not write back advisory statuses: {}", e);
                    }
                }

                Ok(views)
            })
            .await
    }

    /// Last known location and fault, keyed by unit.
    pub async fn equipment_info(&self) -> AppResult<HashMap<String, EquipmentInfo>> {
        self.cache
            .get_or_compute(CacheKey::EquipmentInfo, move || async move {
                let (_, states) = self.project_states().await?;
                Ok(states
                    .iter()
                    .map(|(id, state)| (id.clone(), EquipmentInfo::from(state)))
                    .collect())
            })
            .await
    }

    pub async fn active_trips(&self) -> AppResult<ActiveTripIndex> {
        let trips: Vec<ActiveTrip> = self
            .cache
            .get_or_compute(CacheKey::ActiveTrips, move || async move {
                let records = self.repos.ledger.records().await?;
                Ok(ActiveTripIndex::build(&records).newest_first())
            })
            .await?;
        Ok(ActiveTripIndex::from_trips(trips))
    }

    pub async fn active_trips_newest_first(&self) -> AppResult<Vec<ActiveTrip>> {
        Ok(self.active_trips().await?.newest_first())
    }

    pub async fn find_active_trip(&self, username: &str) -> AppResult<Option<ActiveTrip>> {
        Ok(self.active_trips().await?.find_by_driver(username).cloned())
    }

    /// Distinct drivers currently out on a trip.
    pub async fn active_drivers(&self) -> AppResult<Vec<ActiveDriver>> {
        let mut drivers: Vec<ActiveDriver> = Vec::new();
        for trip in self.active_trips_newest_first().await? {
            if drivers
                .iter()
                .any(|d| d.username.eq_ignore_ascii_case(&trip.driver_username))
            {
                continue;
            }
            drivers.push(ActiveDriver {
                username: trip.driver_username,
                display_name: trip.driver_display_name,
            });
        }
        Ok(drivers)
    }

    pub async fn zone_options(&self) -> AppResult<Vec<String>> {
        self.cache
            .get_or_compute(CacheKey::ZoneOptions, move || async move {
                self.repos.equipment.list_zones().await
            })
            .await
    }

    pub async fn equipment_overview(&self) -> AppResult<Vec<EquipmentOverview>> {
        let statuses = self.equipment_statuses().await?;
        let mut info = self.equipment_info().await?;
        Ok(statuses
            .into_iter()
            .map(|view| {
                let unit_info = info
                    .remove(&view.equipment_id)
                    .unwrap_or_else(|| EquipmentInfo::from(&EquipmentState::default()));
                EquipmentOverview {
                    equipment_id: view.equipment_id,
                    status: view.status,
                    location: unit_info.location,
                    fault: unit_info.fault,
                    store_only: view.store_only,
                }
            })
            .collect())
    }

    pub async fn user_directory(&self) -> AppResult<UserDirectory> {
        self.cache
            .get_or_compute(CacheKey::UserDirectory, move || async move {
                Ok(UserDirectory::new(self.repos.users.list_users().await?))
            })
            .await
    }

    /// Latest maintenance entries, newest first.
    pub async fn maintenance_log(&self) -> AppResult<Vec<MaintenanceLogEntry>> {
        self.cache
            .get_or_compute(CacheKey::MaintenanceLog, move || async move {
                self.repos
                    .audit
                    .recent_maintenance(DASHBOARD_MAINTENANCE_ENTRIES)
                    .await
            })
            .await
    }

    pub async fn dashboard(&self) -> AppResult<Dashboard> {
        let directory = self.user_directory().await?;
        let active_checkouts = self
            .active_trips_newest_first()
            .await?
            .into_iter()
            .map(|trip| {
                let carrier = directory
                    .carrier_of(&trip.driver_username)
                    .unwrap_or(UNKNOWN_CARRIER)
                    .to_string();
                ActiveCheckout { trip, carrier }
            })
            .collect();

        Ok(Dashboard {
            equipment_statuses: self.equipment_statuses().await?,
            users: directory.summaries(),
            maintenance_log: self.maintenance_log().await?,
            active_checkouts,
        })
    }
}
