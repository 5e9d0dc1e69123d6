//! Trip ledger records
//!
//! `TripRecord` is the unit of the append-only ledger and the only ground
//! truth in the system. `ActiveTrip` is derived from it and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::UnknownLabel;

/// Kind of ledger event, persisted with the labels the yard has always used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "Check-Out")]
    CheckOut,
    #[serde(rename = "Check-In")]
    CheckIn,
    #[serde(rename = "Maintenance Start")]
    MaintenanceStart,
    #[serde(rename = "Maintenance End")]
    MaintenanceEnd,
    #[serde(rename = "Location Update")]
    LocationUpdate,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::CheckOut => "Check-Out",
            EventType::CheckIn => "Check-In",
            EventType::MaintenanceStart => "Maintenance Start",
            EventType::MaintenanceEnd => "Maintenance End",
            EventType::LocationUpdate => "Location Update",
        }
    }

    /// Events whose `zone` column places the unit.
    pub fn places_unit(&self) -> bool {
        matches!(self, EventType::CheckOut | EventType::LocationUpdate)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Check-Out" => Ok(EventType::CheckOut),
            "Check-In" => Ok(EventType::CheckIn),
            "Maintenance Start" => Ok(EventType::MaintenanceStart),
            "Maintenance End" => Ok(EventType::MaintenanceEnd),
            "Location Update" => Ok(EventType::LocationUpdate),
            other => Err(UnknownLabel::new("event type", other)),
        }
    }
}

/// One immutable ledger row.
///
/// Text columns use the empty string for "not set", the way the positional
/// row schema stores them. `worked` is the only field that may change after
/// the record is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    /// Absent for events outside a trip (location updates, maintenance).
    pub trip_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub operator_username: String,
    pub driver_display_name: String,
    pub truck: String,
    pub trailer: String,
    pub equipment_id: String,
    pub route: String,
    pub zone: String,
    pub event_type: EventType,
    pub checkout_notes: String,
    pub check_in_zone: String,
    pub check_in_notes: String,
    pub plugged_in: Option<bool>,
    pub worked: Option<bool>,
    /// The other unit of a swap: the new unit on the check-in row, the old
    /// unit on the check-out row.
    pub related_equipment_id: Option<String>,
    /// Appended by an administrator on someone else's behalf.
    pub admin_override: bool,
}

impl TripRecord {
    /// Blank record of the given kind, stamped now.
    pub fn event(event_type: EventType, operator_username: impl Into<String>) -> Self {
        Self {
            trip_id: None,
            timestamp: Utc::now(),
            operator_username: operator_username.into(),
            driver_display_name: String::new(),
            truck: String::new(),
            trailer: String::new(),
            equipment_id: String::new(),
            route: String::new(),
            zone: String::new(),
            event_type,
            checkout_notes: String::new(),
            check_in_zone: String::new(),
            check_in_notes: String::new(),
            plugged_in: None,
            worked: None,
            related_equipment_id: None,
            admin_override: false,
        }
    }

    /// The trip id, treating an empty string as no trip.
    pub fn trip_id(&self) -> Option<&str> {
        self.trip_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn is_checkout_of(&self, trip_id: &str) -> bool {
        self.event_type == EventType::CheckOut && self.trip_id() == Some(trip_id)
    }
}

/// Fresh trip identifier, e.g. `TRIP-3FA85F64A1B2`.
pub fn new_trip_id() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("TRIP-{}", raw[..12].to_uppercase())
}

/// A trip whose check-out has no later check-in with the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTrip {
    pub trip_id: String,
    pub driver_username: String,
    pub driver_display_name: String,
    pub truck: String,
    pub trailer: String,
    pub equipment_id: String,
    pub route: String,
    pub zone: String,
    pub checkout_timestamp: DateTime<Utc>,
}

impl ActiveTrip {
    pub fn from_checkout(trip_id: &str, record: &TripRecord) -> Self {
        Self {
            trip_id: trip_id.to_string(),
            driver_username: record.operator_username.clone(),
            driver_display_name: record.driver_display_name.clone(),
            truck: record.truck.clone(),
            trailer: record.trailer.clone(),
            equipment_id: record.equipment_id.clone(),
            route: record.route.clone(),
            zone: record.zone.clone(),
            checkout_timestamp: record.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_labels() {
        for event in [
            EventType::CheckOut,
            EventType::CheckIn,
            EventType::MaintenanceStart,
            EventType::MaintenanceEnd,
            EventType::LocationUpdate,
        ] {
            assert_eq!(event.as_str().parse::<EventType>(), Ok(event));
        }
        assert!("Checked Out".parse::<EventType>().is_err());
        assert_eq!(
            serde_json::to_string(&EventType::CheckOut).unwrap(),
            "\"Check-Out\""
        );
    }

    #[test]
    fn test_empty_trip_id_is_no_trip() {
        let mut record = TripRecord::event(EventType::LocationUpdate, "ls1");
        assert_eq!(record.trip_id(), None);
        record.trip_id = Some(String::new());
        assert_eq!(record.trip_id(), None);
        record.trip_id = Some("TRIP-1".to_string());
        assert_eq!(record.trip_id(), Some("TRIP-1"));
    }

    #[test]
    fn test_new_trip_id_shape() {
        let a = new_trip_id();
        let b = new_trip_id();
        assert!(a.starts_with("TRIP-"));
        assert_eq!(a.len(), 17);
        assert_ne!(a, b);
    }
}
