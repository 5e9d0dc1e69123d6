//! Equipment units (EPJs)
//!
//! The registry only stores identity and policy (`store_only`). Status,
//! location and fault are projections over the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{EventType, UnknownLabel};

/// Location reported for a unit with no placing event in the ledger.
pub const UNKNOWN_LOCATION: &str = "N/A";
/// Fault reported for a unit with no notes in the ledger.
pub const NO_FAULT: &str = "No issues reported";
/// Zone recorded on overspill checkouts, which carry no unit.
pub const OVERSPILL_ZONE: &str = "Overspill";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentStatus {
    Available,
    #[serde(rename = "Checked Out")]
    CheckedOut,
    Maintenance,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::Available => "Available",
            EquipmentStatus::CheckedOut => "Checked Out",
            EquipmentStatus::Maintenance => "Maintenance",
        }
    }

    /// Status implied by the most recent event of this kind, if any.
    pub fn after(event: EventType) -> Option<Self> {
        match event {
            EventType::CheckOut => Some(EquipmentStatus::CheckedOut),
            EventType::CheckIn | EventType::MaintenanceEnd => Some(EquipmentStatus::Available),
            EventType::MaintenanceStart => Some(EquipmentStatus::Maintenance),
            EventType::LocationUpdate => None,
        }
    }

    /// Event to append so that the projector yields this status.
    pub fn forcing_event(&self) -> EventType {
        match self {
            EquipmentStatus::Available => EventType::CheckIn,
            EquipmentStatus::CheckedOut => EventType::CheckOut,
            EquipmentStatus::Maintenance => EventType::MaintenanceStart,
        }
    }
}

impl Default for EquipmentStatus {
    fn default() -> Self {
        EquipmentStatus::Available
    }
}

impl fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquipmentStatus {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Available" => Ok(EquipmentStatus::Available),
            "Checked Out" => Ok(EquipmentStatus::CheckedOut),
            "Maintenance" => Ok(EquipmentStatus::Maintenance),
            other => Err(UnknownLabel::new("equipment status", other)),
        }
    }
}

/// Registry row. `status` is advisory: the projector overwrites it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentUnit {
    pub equipment_id: String,
    pub status: EquipmentStatus,
    pub store_only: bool,
}

impl EquipmentUnit {
    pub fn new(equipment_id: impl Into<String>, store_only: bool) -> Self {
        Self {
            equipment_id: equipment_id.into(),
            status: EquipmentStatus::Available,
            store_only,
        }
    }
}

/// Projected state of one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentState {
    pub status: EquipmentStatus,
    pub location: String,
    pub fault: String,
}

impl Default for EquipmentState {
    fn default() -> Self {
        Self {
            status: EquipmentStatus::Available,
            location: UNKNOWN_LOCATION.to_string(),
            fault: NO_FAULT.to_string(),
        }
    }
}

/// Last known location and fault of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentInfo {
    pub location: String,
    pub fault: String,
}

impl From<&EquipmentState> for EquipmentInfo {
    fn from(state: &EquipmentState) -> Self {
        Self {
            location: state.location.clone(),
            fault: state.fault.clone(),
        }
    }
}

/// Entry of `getEquipmentStatuses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentStatusView {
    pub equipment_id: String,
    pub status: EquipmentStatus,
    pub store_only: bool,
}

/// Statuses joined with location and fault, for the yard board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentOverview {
    pub equipment_id: String,
    pub status: EquipmentStatus,
    pub location: String,
    pub fault: String,
    pub store_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_after_event() {
        assert_eq!(EquipmentStatus::after(EventType::CheckOut), Some(EquipmentStatus::CheckedOut));
        assert_eq!(EquipmentStatus::after(EventType::CheckIn), Some(EquipmentStatus::Available));
        assert_eq!(EquipmentStatus::after(EventType::MaintenanceEnd), Some(EquipmentStatus::Available));
        assert_eq!(EquipmentStatus::after(EventType::MaintenanceStart), Some(EquipmentStatus::Maintenance));
        assert_eq!(EquipmentStatus::after(EventType::LocationUpdate), None);
    }

    #[test]
    fn test_forcing_event_round_trips_through_projection_rule() {
        for status in [
            EquipmentStatus::Available,
            EquipmentStatus::CheckedOut,
            EquipmentStatus::Maintenance,
        ] {
            assert_eq!(EquipmentStatus::after(status.forcing_event()), Some(status));
        }
    }

    #[test]
    fn test_status_labels() {
        assert_eq!("Checked Out".parse::<EquipmentStatus>(), Ok(EquipmentStatus::CheckedOut));
        assert_eq!(serde_json::to_string(&EquipmentStatus::CheckedOut).unwrap(), "\"Checked Out\"");
        assert!("Lost".parse::<EquipmentStatus>().is_err());
    }
}
