//! Active trip index
//!
//! Forward replay of check-outs and check-ins keyed by trip id.

use std::collections::HashMap;

use crate::models::{ActiveTrip, EventType, TripRecord};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveTripIndex {
    trips: HashMap<String, ActiveTrip>,
}

impl ActiveTripIndex {
    pub fn build(records: &[TripRecord]) -> Self {
        let mut trips = HashMap::new();
        for record in records {
            let Some(trip_id) = record.trip_id() else {
                continue;
            };
            match record.event_type {
                EventType::CheckOut => {
                    trips.insert(trip_id.to_string(), ActiveTrip::from_checkout(trip_id, record));
                }
                EventType::CheckIn => {
                    trips.remove(trip_id);
                }
                EventType::MaintenanceStart | EventType::MaintenanceEnd | EventType::LocationUpdate => {}
            }
        }
        Self { trips }
    }

    /// Rebuild from a cached list of trips.
    pub fn from_trips(trips: Vec<ActiveTrip>) -> Self {
        Self {
            trips: trips.into_iter().map(|t| (t.trip_id.clone(), t)).collect(),
        }
    }

    pub fn get(&self, trip_id: &str) -> Option<&ActiveTrip> {
        self.trips.get(trip_id)
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    /// The driver's most recent open trip. Duplicates can exist after
    /// overrides, so the latest check-out wins.
    pub fn find_by_driver(&self, username: &str) -> Option<&ActiveTrip> {
        self.trips
            .values()
            .filter(|t| t.driver_username.eq_ignore_ascii_case(username))
            .max_by(|a, b| {
                a.checkout_timestamp
                    .cmp(&b.checkout_timestamp)
                    .then_with(|| a.trip_id.cmp(&b.trip_id))
            })
    }

    /// Open trip holding the given unit, if any.
    pub fn find_by_equipment(&self, equipment_id: &str) -> Option<&ActiveTrip> {
        self.trips
            .values()
            .filter(|t| !t.equipment_id.is_empty() && t.equipment_id == equipment_id)
            .max_by_key(|t| t.checkout_timestamp)
    }

    pub fn newest_first(&self) -> Vec<ActiveTrip> {
        let mut trips: Vec<ActiveTrip> = self.trips.values().cloned().collect();
        trips.sort_by(|a, b| {
            b.checkout_timestamp
                .cmp(&a.checkout_timestamp)
                .then_with(|| b.trip_id.cmp(&a.trip_id))
        });
        trips
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn trip_event(trip_id: &str, event_type: EventType, driver: &str, epj: &str) -> TripRecord {
        TripRecord {
            trip_id: Some(trip_id.to_string()),
            equipment_id: epj.to_string(),
            ..TripRecord::event(event_type, driver)
        }
    }

    #[test]
    fn test_check_in_closes_trip() {
        let ledger = vec![
            trip_event("T1", EventType::CheckOut, "alice", "E1"),
            trip_event("T2", EventType::CheckOut, "bob", "E2"),
            trip_event("T1", EventType::CheckIn, "alice", "E1"),
        ];
        let index = ActiveTripIndex::build(&ledger);
        assert_eq!(index.len(), 1);
        assert!(index.get("T1").is_none());
        assert_eq!(index.get("T2").map(|t| t.equipment_id.as_str()), Some("E2"));
    }

    #[test]
    fn test_non_trip_events_are_ignored() {
        let mut location = TripRecord::event(EventType::LocationUpdate, "ls1");
        location.equipment_id = "E1".to_string();
        let ledger = vec![
            trip_event("T1", EventType::CheckOut, "alice", "E1"),
            location,
            trip_event("T1", EventType::MaintenanceStart, "admin", "E1"),
        ];
        assert_eq!(ActiveTripIndex::build(&ledger).len(), 1);
    }

    #[test]
    fn test_check_in_before_check_out_does_not_resurrect() {
        let ledger = vec![
            trip_event("T1", EventType::CheckIn, "alice", "E1"),
            trip_event("T1", EventType::CheckOut, "alice", "E1"),
        ];
        assert!(ActiveTripIndex::build(&ledger).get("T1").is_some());
    }

    #[test]
    fn test_find_by_driver_prefers_latest() {
        let now = Utc::now();
        let mut older = trip_event("T1", EventType::CheckOut, "alice", "E1");
        older.timestamp = now - Duration::minutes(10);
        let mut newer = trip_event("T2", EventType::CheckOut, "Alice", "E2");
        newer.timestamp = now;

        let index = ActiveTripIndex::build(&[older, newer]);
        assert_eq!(index.find_by_driver("ALICE").map(|t| t.trip_id.as_str()), Some("T2"));
        assert!(index.find_by_driver("bob").is_none());
    }

    #[test]
    fn test_newest_first_ordering() {
        let now = Utc::now();
        let ledger: Vec<TripRecord> = (0..3)
            .map(|i| {
                let mut r = trip_event(&format!("T{}", i), EventType::CheckOut, "d", "E");
                r.timestamp = now + Duration::seconds(i);
                r
            })
            .collect();
        let ids: Vec<String> = ActiveTripIndex::build(&ledger)
            .newest_first()
            .into_iter()
            .map(|t| t.trip_id)
            .collect();
        assert_eq!(ids, vec!["T2", "T1", "T0"]);
    }
}
