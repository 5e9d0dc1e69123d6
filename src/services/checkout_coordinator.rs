//! Checkout coordinator
//!
//! Every ledger or registry mutation runs under one process-wide mutex. Inside
//! it, preconditions are projected straight from the ledger (never read from
//! the shared cache), the records are appended, and the dependent cache keys
//! are invalidated before the lock is released. A caller that cannot get the lock within the timeout fails with
//! `LockTimeout` and nothing is written.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

use super::active_trip_index::ActiveTripIndex;
use super::projection_service::ProjectionService;
use super::status_projector;
use crate::cache::CacheKey;
use crate::models::{
    new_trip_id, EquipmentState, EquipmentStatus, EquipmentUnit, EventType, Identity,
    MaintenanceAction, MaintenanceLogEntry, TripRecord, OVERSPILL_ZONE, UNKNOWN_LOCATION,
};
use crate::repositories::Repositories;
use crate::utils::errors::{bad_request_error, not_found_error, AppError, AppResult};

/// Default bound on waiting for the coordinator lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Driver display name stamped on administrative records.
const ADMIN_DISPLAY_NAME: &str = "ADMIN";
/// Driver display name stamped on location updates.
const LOAD_SUPPORT_DISPLAY_NAME: &str = "LOAD SUPPORT";
const REASON_PENDING: &str = "Reason pending";
const RETURNED_TO_SERVICE: &str = "Returned to service";

/// What a checkout takes.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutTarget {
    Unit(String),
    /// Trip without a unit; recorded in the overspill zone.
    Overspill,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripDetails {
    pub driver_name: String,
    pub truck: String,
    pub trailer: String,
    pub route: String,
    pub fault_report: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckInReport {
    pub check_in_zone: String,
    pub fault_report: String,
    pub plugged_in: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwapRequest {
    /// Required when an administrator swaps on a driver's behalf.
    pub trip_id: Option<String>,
    pub new_equipment_id: String,
    pub check_in_zone: String,
    /// Puts the old unit into maintenance with this reason.
    pub maintenance_reason: Option<String>,
}

/// Result of an operation that opened a trip.
#[derive(Debug, Clone, PartialEq)]
pub struct TripReceipt {
    pub trip_id: String,
    pub message: String,
}

/// Projections rebuilt from the ledger while the lock is held.
struct LedgerSnapshot {
    records: Vec<TripRecord>,
    states: HashMap<String, EquipmentState>,
    trips: ActiveTripIndex,
}

impl LedgerSnapshot {
    /// `None` for units that are not registered.
    fn status_of(&self, equipment_id: &str) -> Option<EquipmentStatus> {
        self.states.get(equipment_id).map(|state| state.status)
    }

    fn location_of(&self, equipment_id: &str) -> String {
        self.states
            .get(equipment_id)
            .map(|state| state.location.clone())
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string())
    }
}

#[derive(Clone)]
pub struct CheckoutCoordinator {
    repos: Repositories,
    projections: ProjectionService,
    lock: Arc<Mutex<()>>,
    lock_timeout: Duration,
}

impl CheckoutCoordinator {
    pub fn new(repos: Repositories, projections: ProjectionService, lock_timeout: Duration) -> Self {
        Self {
            repos,
            projections,
            lock: Arc::new(Mutex::new(())),
            lock_timeout,
        }
    }

    async fn acquire(&self) -> AppResult<MutexGuard<'_, ()>> {
        match tokio::time::timeout(self.lock_timeout, self.lock.lock()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                warn!("⏰ Checkout lock not acquired within {:?}", self.lock_timeout);
                Err(AppError::LockTimeout)
            }
        }
    }

    /// Append `records` as one batch, then drop every cache key they affect.
    /// Takes the guard so it can only run inside the critical section.
    async fn commit(&self, _held: &MutexGuard<'_, ()>, records: Vec<TripRecord>) -> AppResult<()> {
        let events: Vec<EventType> = records.iter().map(|r| r.event_type).collect();
        self.repos.ledger.append_batch(records).await?;
        self.projections.cache().invalidate_for_events(&events).await;
        Ok(())
    }

    /// Lock-free readers can repopulate the cache with a pre-write view at
    /// any moment, so preconditions are projected from the ledger here.
    async fn snapshot(&self, _held: &MutexGuard<'_, ()>) -> AppResult<LedgerSnapshot> {
        let records = self.repos.ledger.records().await?;
        let equipment_ids: Vec<String> = self
            .repos
            .equipment
            .list_equipment()
            .await?
            .into_iter()
            .map(|unit| unit.equipment_id)
            .collect();
        let states = status_projector::project(&records, &equipment_ids);
        let trips = ActiveTripIndex::build(&records);
        Ok(LedgerSnapshot {
            records,
            states,
            trips,
        })
    }

    pub async fn checkout(
        &self,
        operator: &Identity,
        target: CheckoutTarget,
        details: TripDetails,
    ) -> AppResult<TripReceipt> {
        if !operator.role.can_check_out() {
            return Err(AppError::PermissionDenied);
        }
        let guard = self.acquire().await?;

        let (equipment_id, zone) = match &target {
            CheckoutTarget::Overspill => (String::new(), OVERSPILL_ZONE.to_string()),
            CheckoutTarget::Unit(equipment_id) => {
                let snapshot = self.snapshot(&guard).await?;
                if snapshot.status_of(equipment_id) != Some(EquipmentStatus::Available) {
                    return Err(AppError::EquipmentUnavailable(equipment_id.clone()));
                }
                (equipment_id.clone(), snapshot.location_of(equipment_id))
            }
        };

        let trip_id = new_trip_id();
        let record = TripRecord {
            trip_id: Some(trip_id.clone()),
            driver_display_name: details.driver_name,
            truck: details.truck,
            trailer: details.trailer,
            equipment_id: equipment_id.clone(),
            route: details.route,
            zone,
            checkout_notes: details.fault_report,
            ..TripRecord::event(EventType::CheckOut, operator.username.clone())
        };
        self.commit(&guard, vec![record]).await?;

        let message = match target {
            CheckoutTarget::Unit(_) => format!("Successfully checked out EPJ {}.", equipment_id),
            CheckoutTarget::Overspill => "Successfully checked out for overspill.".to_string(),
        };
        info!("✅ {} opened {} ({})", operator.username, trip_id, message);
        Ok(TripReceipt { trip_id, message })
    }

    /// Close the operator's own active trip.
    pub async fn check_in(&self, operator: &Identity, report: CheckInReport) -> AppResult<String> {
        if !operator.role.can_check_in() {
            return Err(AppError::PermissionDenied);
        }
        let guard = self.acquire().await?;

        let trip = self
            .snapshot(&guard)
            .await?
            .trips
            .find_by_driver(&operator.username)
            .cloned()
            .ok_or(AppError::NoActiveTrip)?;

        let record = TripRecord {
            trip_id: Some(trip.trip_id.clone()),
            driver_display_name: trip.driver_display_name.clone(),
            equipment_id: trip.equipment_id.clone(),
            zone: trip.zone.clone(),
            check_in_zone: report.check_in_zone,
            check_in_notes: report.fault_report,
            plugged_in: report.plugged_in,
            ..TripRecord::event(EventType::CheckIn, operator.username.clone())
        };
        self.commit(&guard, vec![record]).await?;

        info!("✅ {} closed {}", operator.username, trip.trip_id);
        Ok(format!("Successfully checked in EPJ {}.", trip.equipment_id))
    }

    /// Close the current trip on its unit and reopen it on `new_equipment_id`.
    /// All records land in one batch.
    pub async fn swap(&self, operator: &Identity, request: SwapRequest) -> AppResult<TripReceipt> {
        if !operator.role.can_swap() {
            return Err(AppError::PermissionDenied);
        }
        if request.new_equipment_id.trim().is_empty() {
            return Err(bad_request_error("A replacement EPJ is required."));
        }
        let guard = self.acquire().await?;

        let snapshot = self.snapshot(&guard).await?;
        let trips = &snapshot.trips;
        let trip = match (&request.trip_id, operator.role.is_admin()) {
            (Some(trip_id), true) => trips.get(trip_id),
            (None, true) => {
                return Err(bad_request_error("A trip id is required for an administrative swap."))
            }
            (_, false) => trips.find_by_driver(&operator.username),
        }
        .cloned()
        .ok_or_else(|| match &request.trip_id {
            Some(trip_id) => AppError::TripNotFound(trip_id.clone()),
            None => AppError::NoActiveTrip,
        })?;

        let new_id = request.new_equipment_id.trim().to_string();
        if new_id == trip.equipment_id
            || snapshot.status_of(&new_id) != Some(EquipmentStatus::Available)
        {
            return Err(AppError::EquipmentUnavailable(new_id));
        }
        let new_zone = snapshot.location_of(&new_id);

        let mut records = vec![TripRecord {
            trip_id: Some(trip.trip_id.clone()),
            driver_display_name: trip.driver_display_name.clone(),
            equipment_id: trip.equipment_id.clone(),
            zone: trip.zone.clone(),
            check_in_zone: request.check_in_zone.clone(),
            related_equipment_id: Some(new_id.clone()),
            admin_override: operator.role.is_admin(),
            ..TripRecord::event(EventType::CheckIn, operator.username.clone())
        }];

        let maintenance = match &request.maintenance_reason {
            Some(reason) if !trip.equipment_id.is_empty() => {
                let reason = non_empty_or(reason, REASON_PENDING);
                records.push(TripRecord {
                    driver_display_name: ADMIN_DISPLAY_NAME.to_string(),
                    equipment_id: trip.equipment_id.clone(),
                    checkout_notes: reason.clone(),
                    ..TripRecord::event(EventType::MaintenanceStart, operator.username.clone())
                });
                Some(MaintenanceLogEntry {
                    timestamp: chrono::Utc::now(),
                    equipment_id: trip.equipment_id.clone(),
                    action: MaintenanceAction::Start,
                    reason,
                    resolution: String::new(),
                })
            }
            _ => None,
        };

        let new_trip_id = new_trip_id();
        records.push(TripRecord {
            trip_id: Some(new_trip_id.clone()),
            driver_display_name: trip.driver_display_name.clone(),
            truck: trip.truck.clone(),
            trailer: trip.trailer.clone(),
            equipment_id: new_id.clone(),
            route: trip.route.clone(),
            zone: new_zone,
            related_equipment_id: Some(trip.equipment_id.clone()),
            admin_override: operator.role.is_admin(),
            // The reopened trip stays with the original driver.
            ..TripRecord::event(EventType::CheckOut, trip.driver_username.clone())
        });

        self.commit(&guard, records).await?;
        if let Some(entry) = maintenance {
            self.record_maintenance(entry).await;
        }

        info!(
            "🔄 {} swapped {} -> {} ({} -> {})",
            operator.username, trip.equipment_id, new_id, trip.trip_id, new_trip_id
        );
        Ok(TripReceipt {
            trip_id: new_trip_id,
            message: format!(
                "Successfully swapped EPJ {} for EPJ {}.",
                trip.equipment_id, new_id
            ),
        })
    }

    /// Close a trip on the driver's behalf. Only open trips qualify; a closed
    /// trip's unit may already belong to someone else.
    pub async fn force_check_in(&self, operator: &Identity, trip_id: &str) -> AppResult<String> {
        if !operator.role.is_admin() {
            return Err(AppError::PermissionDenied);
        }
        let guard = self.acquire().await?;

        let snapshot = self.snapshot(&guard).await?;
        let not_found = || AppError::TripNotFound(trip_id.to_string());
        if snapshot.trips.get(trip_id).is_none() {
            return Err(not_found());
        }
        let original = snapshot
            .records
            .iter()
            .rev()
            .find(|r| r.is_checkout_of(trip_id))
            .ok_or_else(not_found)?;

        let equipment_id = original.equipment_id.clone();
        let record = TripRecord {
            trip_id: Some(trip_id.to_string()),
            driver_display_name: original.driver_display_name.clone(),
            equipment_id: equipment_id.clone(),
            zone: original.zone.clone(),
            admin_override: true,
            ..TripRecord::event(EventType::CheckIn, operator.username.clone())
        };
        self.commit(&guard, vec![record]).await?;

        info!("🛠️ {} forced check-in of {}", operator.username, trip_id);
        Ok(format!("Successfully checked in EPJ {}.", equipment_id))
    }

    /// Append the record that makes the projector report `status`.
    pub async fn override_status(
        &self,
        operator: &Identity,
        equipment_id: &str,
        status: EquipmentStatus,
    ) -> AppResult<String> {
        if !operator.role.is_admin() {
            return Err(AppError::PermissionDenied);
        }
        let guard = self.acquire().await?;
        self.ensure_registered(equipment_id).await?;

        let event_type = status.forcing_event();
        let trip_id = match status {
            EquipmentStatus::CheckedOut => Some(new_trip_id()),
            // Closes the trip holding the unit, if there is one.
            EquipmentStatus::Available => self
                .snapshot(&guard)
                .await?
                .trips
                .find_by_equipment(equipment_id)
                .map(|t| t.trip_id.clone()),
            EquipmentStatus::Maintenance => None,
        };
        let record = TripRecord {
            trip_id,
            driver_display_name: ADMIN_DISPLAY_NAME.to_string(),
            equipment_id: equipment_id.to_string(),
            admin_override: true,
            ..TripRecord::event(event_type, operator.username.clone())
        };
        self.commit(&guard, vec![record]).await?;

        info!("🛠️ {} set {} to {}", operator.username, equipment_id, status);
        Ok(format!("EPJ {} status set to {}.", equipment_id, status))
    }

    pub async fn set_maintenance(
        &self,
        operator: &Identity,
        equipment_id: &str,
        action: MaintenanceAction,
        reason: Option<String>,
    ) -> AppResult<String> {
        if !operator.role.is_admin() {
            return Err(AppError::PermissionDenied);
        }
        let guard = self.acquire().await?;
        self.ensure_registered(equipment_id).await?;

        let (event_type, notes, entry_reason, resolution) = match action {
            MaintenanceAction::Start => {
                let reason = non_empty_or(reason.as_deref().unwrap_or_default(), REASON_PENDING);
                (EventType::MaintenanceStart, reason.clone(), reason, String::new())
            }
            MaintenanceAction::End => (
                EventType::MaintenanceEnd,
                RETURNED_TO_SERVICE.to_string(),
                String::new(),
                RETURNED_TO_SERVICE.to_string(),
            ),
        };

        let record = TripRecord {
            driver_display_name: ADMIN_DISPLAY_NAME.to_string(),
            equipment_id: equipment_id.to_string(),
            checkout_notes: notes,
            ..TripRecord::event(event_type, operator.username.clone())
        };
        self.commit(&guard, vec![record]).await?;
        self.record_maintenance(MaintenanceLogEntry {
            timestamp: chrono::Utc::now(),
            equipment_id: equipment_id.to_string(),
            action,
            reason: entry_reason,
            resolution,
        })
        .await;

        info!("🔧 {} recorded {} for {}", operator.username, action, equipment_id);
        Ok(format!("EPJ {} status updated.", equipment_id))
    }

    pub async fn update_location(
        &self,
        operator: &Identity,
        equipment_id: &str,
        new_location: &str,
    ) -> AppResult<String> {
        if !operator.role.can_update_location() {
            return Err(AppError::PermissionDenied);
        }
        if new_location.trim().is_empty() {
            return Err(bad_request_error("A location is required."));
        }
        let guard = self.acquire().await?;
        self.ensure_registered(equipment_id).await?;

        let record = TripRecord {
            driver_display_name: LOAD_SUPPORT_DISPLAY_NAME.to_string(),
            equipment_id: equipment_id.to_string(),
            zone: new_location.to_string(),
            check_in_zone: new_location.to_string(),
            checkout_notes: format!("Updated by {}", operator.role),
            ..TripRecord::event(EventType::LocationUpdate, operator.username.clone())
        };
        self.commit(&guard, vec![record]).await?;

        info!("📍 {} moved {} to {}", operator.username, equipment_id, new_location);
        Ok(format!("Location for EPJ {} updated to {}.", equipment_id, new_location))
    }

    pub async fn set_trip_worked(
        &self,
        operator: &Identity,
        trip_id: &str,
        worked: bool,
    ) -> AppResult<String> {
        if !operator.role.is_admin() {
            return Err(AppError::PermissionDenied);
        }
        let _guard = self.acquire().await?;
        if !self.repos.ledger.set_worked(trip_id, worked).await? {
            return Err(AppError::TripNotFound(trip_id.to_string()));
        }
        // `worked` feeds no projection, so nothing to invalidate.
        Ok(format!("Trip {} marked as {}.", trip_id, if worked { "worked" } else { "not worked" }))
    }

    pub async fn add_equipment(
        &self,
        operator: &Identity,
        equipment_id: &str,
        store_only: bool,
    ) -> AppResult<String> {
        if !operator.role.is_admin() {
            return Err(AppError::PermissionDenied);
        }
        let equipment_id = equipment_id.trim();
        if equipment_id.is_empty() {
            return Err(bad_request_error("An EPJ id is required."));
        }
        let _guard = self.acquire().await?;
        self.repos
            .equipment
            .add_equipment(EquipmentUnit::new(equipment_id, store_only))
            .await?;
        self.invalidate_registry().await;

        info!("➕ {} registered EPJ {}", operator.username, equipment_id);
        Ok(format!("EPJ {} added.", equipment_id))
    }

    /// Only units that currently project `Available` can be removed.
    pub async fn remove_equipment(&self, operator: &Identity, equipment_id: &str) -> AppResult<String> {
        if !operator.role.is_admin() {
            return Err(AppError::PermissionDenied);
        }
        let guard = self.acquire().await?;
        match self.snapshot(&guard).await?.status_of(equipment_id) {
            None => return Err(not_found_error("EPJ", equipment_id)),
            Some(EquipmentStatus::Available) => {}
            Some(status) => {
                return Err(AppError::Conflict(format!(
                    "EPJ {} is {} and cannot be removed.",
                    equipment_id, status
                )))
            }
        }
        self.repos.equipment.remove_equipment(equipment_id).await?;
        self.invalidate_registry().await;

        info!("➖ {} removed EPJ {}", operator.username, equipment_id);
        Ok(format!("EPJ {} removed.", equipment_id))
    }

    pub async fn add_zone(&self, operator: &Identity, zone: &str) -> AppResult<String> {
        if !operator.role.is_admin() {
            return Err(AppError::PermissionDenied);
        }
        let zone = zone.trim();
        if zone.is_empty() {
            return Err(bad_request_error("A zone name is required."));
        }
        let _guard = self.acquire().await?;
        self.repos.equipment.add_zone(zone).await?;
        self.projections.cache().invalidate(&[CacheKey::ZoneOptions]).await;
        Ok(format!("Zone {} added.", zone))
    }

    async fn ensure_registered(&self, equipment_id: &str) -> AppResult<()> {
        let known = self
            .repos
            .equipment
            .list_equipment()
            .await?
            .iter()
            .any(|u| u.equipment_id == equipment_id);
        if known {
            Ok(())
        } else {
            Err(not_found_error("EPJ", equipment_id))
        }
    }

    /// Runs after the ledger commit, so a failed audit write must not turn a
    /// durable change into an error the caller would retry.
    async fn record_maintenance(&self, entry: MaintenanceLogEntry) {
        let equipment_id = entry.equipment_id.clone();
        if let Err(e) = self.repos.audit.record_maintenance(entry).await {
            error!("❌ Could not record maintenance log entry for {}: {}", equipment_id, e);
        }
        self.projections
            .cache()
            .invalidate(&[CacheKey::MaintenanceLog])
            .await;
    }

    async fn invalidate_registry(&self) {
        self.projections
            .cache()
            .invalidate(&[CacheKey::EquipmentStatuses, CacheKey::EquipmentInfo])
            .await;
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
