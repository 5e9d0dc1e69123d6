//! Status projector
//!
//! Derives status, location and fault for every registered unit from the
//! ledger. Each field is resolved independently from the newest record that
//! carries it, so a unit's location may come from a more recent record than
//! its fault.

use std::collections::HashMap;

use crate::models::{EquipmentState, EquipmentStatus, TripRecord};

#[derive(Default)]
struct Resolution {
    status: Option<EquipmentStatus>,
    location: Option<String>,
    fault: Option<String>,
}

impl Resolution {
    fn is_complete(&self) -> bool {
        self.status.is_some() && self.location.is_some() && self.fault.is_some()
    }

    /// Fill whichever fields `record` resolves. Returns true when this call
    /// completed the resolution.
    fn absorb(&mut self, record: &TripRecord) -> bool {
        if self.status.is_none() {
            self.status = EquipmentStatus::after(record.event_type);
        }
        if self.location.is_none() {
            self.location = location_of(record);
        }
        if self.fault.is_none() {
            self.fault = fault_of(record);
        }
        self.is_complete()
    }

    fn into_state(self) -> EquipmentState {
        let mut state = EquipmentState::default();
        if let Some(status) = self.status {
            state.status = status;
        }
        if let Some(location) = self.location {
            state.location = location;
        }
        if let Some(fault) = self.fault {
            state.fault = fault;
        }
        state
    }
}

fn location_of(record: &TripRecord) -> Option<String> {
    if !record.check_in_zone.is_empty() {
        Some(record.check_in_zone.clone())
    } else if record.event_type.places_unit() && !record.zone.is_empty() {
        Some(record.zone.clone())
    } else {
        None
    }
}

fn fault_of(record: &TripRecord) -> Option<String> {
    [&record.check_in_notes, &record.checkout_notes]
        .into_iter()
        .find(|notes| !notes.is_empty())
        .cloned()
}

/// Backward scan that stops once every known unit is fully resolved.
pub fn project(records: &[TripRecord], equipment_ids: &[String]) -> HashMap<String, EquipmentState> {
    let mut pending: HashMap<&str, Resolution> = equipment_ids
        .iter()
        .map(|id| (id.as_str(), Resolution::default()))
        .collect();
    let mut complete = 0;

    for record in records.iter().rev() {
        if complete == pending.len() {
            break;
        }
        if let Some(resolution) = pending.get_mut(record.equipment_id.as_str()) {
            if !resolution.is_complete() && resolution.absorb(record) {
                complete += 1;
            }
        }
    }

    pending
        .into_iter()
        .map(|(id, resolution)| (id.to_string(), resolution.into_state()))
        .collect()
}

/// Same projection without the early exit. Kept as the reference the
/// optimized scan is checked against.
pub fn project_full_scan(
    records: &[TripRecord],
    equipment_ids: &[String],
) -> HashMap<String, EquipmentState> {
    let mut pending: HashMap<&str, Resolution> = equipment_ids
        .iter()
        .map(|id| (id.as_str(), Resolution::default()))
        .collect();

    for record in records.iter().rev() {
        if let Some(resolution) = pending.get_mut(record.equipment_id.as_str()) {
            resolution.absorb(record);
        }
    }

    pending
        .into_iter()
        .map(|(id, resolution)| (id.to_string(), resolution.into_state()))
        .collect()
}
