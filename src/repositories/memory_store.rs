//! In-process store
//!
//! Every table is a `Vec` behind its own `RwLock`. A ledger batch is pushed
//! under a single write guard, so readers never see half of it.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AuditLog, EquipmentRegistry, LedgerStore, UserRegistry};
use crate::models::{
    EquipmentStatus, EquipmentUnit, LoginAuditEntry, MaintenanceLogEntry, Role, TripRecord,
    User,
};
use crate::utils::errors::{conflict_error, AppResult};

#[derive(Default)]
pub struct MemoryStore {
    ledger: RwLock<Vec<TripRecord>>,
    equipment: RwLock<Vec<EquipmentUnit>>,
    zones: RwLock<Vec<String>>,
    users: RwLock<Vec<User>>,
    logins: RwLock<Vec<LoginAuditEntry>>,
    maintenance: RwLock<Vec<MaintenanceLogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every login attempt recorded so far, oldest first.
    pub async fn login_audit(&self) -> Vec<LoginAuditEntry> {
        self.logins.read().await.clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn append_batch(&self, records: Vec<TripRecord>) -> AppResult<()> {
        let mut ledger = self.ledger.write().await;
        ledger.extend(records);
        Ok(())
    }

    async fn records(&self) -> AppResult<Vec<TripRecord>> {
        Ok(self.ledger.read().await.clone())
    }

    async fn set_worked(&self, trip_id: &str, worked: bool) -> AppResult<bool> {
        let mut ledger = self.ledger.write().await;
        match ledger.iter_mut().rev().find(|r| r.is_checkout_of(trip_id)) {
            Some(record) => {
                record.worked = Some(worked);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl EquipmentRegistry for MemoryStore {
    async fn list_equipment(&self) -> AppResult<Vec<EquipmentUnit>> {
        Ok(self.equipment.read().await.clone())
    }

    async fn add_equipment(&self, unit: EquipmentUnit) -> AppResult<()> {
        let mut equipment = self.equipment.write().await;
        if equipment.iter().any(|u| u.equipment_id == unit.equipment_id) {
            return Err(conflict_error("EPJ", "id", &unit.equipment_id));
        }
        equipment.push(unit);
        Ok(())
    }

    async fn remove_equipment(&self, equipment_id: &str) -> AppResult<bool> {
        let mut equipment = self.equipment.write().await;
        let before = equipment.len();
        equipment.retain(|u| u.equipment_id != equipment_id);
        Ok(equipment.len() != before)
    }

    async fn update_advisory_statuses(&self, statuses: &[(String, EquipmentStatus)]) -> AppResult<()> {
        let mut equipment = self.equipment.write().await;
        for unit in equipment.iter_mut() {
            if let Some((_, status)) = statuses.iter().find(|(id, _)| *id == unit.equipment_id) {
                unit.status = *status;
            }
        }
        Ok(())
    }

    async fn list_zones(&self) -> AppResult<Vec<String>> {
        Ok(self.zones.read().await.clone())
    }

    async fn add_zone(&self, zone: &str) -> AppResult<()> {
        let mut zones = self.zones.write().await;
        if !zones.iter().any(|z| z == zone) {
            zones.push(zone.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl UserRegistry for MemoryStore {
    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn insert_users(&self, users: Vec<User>) -> AppResult<()> {
        let mut existing = self.users.write().await;
        for user in &users {
            if existing.iter().any(|u| u.username.eq_ignore_ascii_case(&user.username)) {
                return Err(conflict_error("User", "username", &user.username));
            }
        }
        existing.extend(users);
        Ok(())
    }

    async fn update_profile(&self, username: &str, role: Role, carrier: &str) -> AppResult<bool> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.username.eq_ignore_ascii_case(username)) {
            Some(user) => {
                user.role = role;
                user.carrier = carrier.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_password_hash(&self, username: &str, password_hash: &str) -> AppResult<bool> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.username.eq_ignore_ascii_case(username)) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, username: &str) -> AppResult<bool> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| !u.username.eq_ignore_ascii_case(username));
        Ok(users.len() != before)
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn record_login(&self, entry: LoginAuditEntry) -> AppResult<()> {
        self.logins.write().await.push(entry);
        Ok(())
    }

    async fn record_maintenance(&self, entry: MaintenanceLogEntry) -> AppResult<()> {
        self.maintenance.write().await.push(entry);
        Ok(())
    }

    async fn recent_maintenance(&self, limit: usize) -> AppResult<Vec<MaintenanceLogEntry>> {
        let log = self.maintenance.read().await;
        Ok(log.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventType;
    use crate::models::MaintenanceAction;
    use chrono::Utc;

    fn checkout(trip_id: &str, epj: &str) -> TripRecord {
        TripRecord {
            trip_id: Some(trip_id.to_string()),
            equipment_id: epj.to_string(),
            ..TripRecord::event(EventType::CheckOut, "driver1")
        }
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = MemoryStore::new();
        store.append(checkout("T1", "E1")).await.unwrap();
        store
            .append_batch(vec![checkout("T2", "E2"), checkout("T3", "E3")])
            .await
            .unwrap();

        let ids: Vec<_> = store
            .records()
            .await
            .unwrap()
            .iter()
            .map(|r| r.trip_id().unwrap_or_default().to_string())
            .collect();
        assert_eq!(ids, vec!["T1", "T2", "T3"]);
    }

    #[tokio::test]
    async fn test_set_worked_only_touches_checkouts() {
        let store = MemoryStore::new();
        store.append(checkout("T1", "E1")).await.unwrap();
        store
            .append(TripRecord {
                trip_id: Some("T1".to_string()),
                ..TripRecord::event(EventType::CheckIn, "driver1")
            })
            .await
            .unwrap();

        assert!(store.set_worked("T1", true).await.unwrap());
        assert!(!store.set_worked("T9", true).await.unwrap());

        let records = store.records().await.unwrap();
        assert_eq!(records[0].worked, Some(true));
        assert_eq!(records[1].worked, None);
    }

    #[tokio::test]
    async fn test_equipment_registry() {
        let store = MemoryStore::new();
        store.add_equipment(EquipmentUnit::new("E1", false)).await.unwrap();
        assert!(store.add_equipment(EquipmentUnit::new("E1", true)).await.is_err());

        store
            .update_advisory_statuses(&[("E1".to_string(), EquipmentStatus::CheckedOut)])
            .await
            .unwrap();
        assert_eq!(store.list_equipment().await.unwrap()[0].status, EquipmentStatus::CheckedOut);

        assert!(store.remove_equipment("E1").await.unwrap());
        assert!(!store.remove_equipment("E1").await.unwrap());
    }

    #[tokio::test]
    async fn test_users_match_case_insensitively() {
        let store = MemoryStore::new();
        let user = User {
            username: "Alice".to_string(),
            password_hash: "h".to_string(),
            role: Role::Driver,
            carrier: "ACME".to_string(),
        };
        store.insert_users(vec![user.clone()]).await.unwrap();
        assert!(store
            .insert_users(vec![User { username: "alice".to_string(), ..user }])
            .await
            .is_err());

        assert!(store.update_profile("ALICE", Role::Admin, "Other").await.unwrap());
        assert_eq!(store.list_users().await.unwrap()[0].role, Role::Admin);
        assert!(store.delete_user("alice").await.unwrap());
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_maintenance_newest_first() {
        let store = MemoryStore::new();
        for epj in ["E1", "E2", "E3"] {
            store
                .record_maintenance(MaintenanceLogEntry {
                    timestamp: Utc::now(),
                    equipment_id: epj.to_string(),
                    action: MaintenanceAction::Start,
                    reason: "leak".to_string(),
                    resolution: String::new(),
                })
                .await
                .unwrap();
        }
        let recent = store.recent_maintenance(2).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|e| e.equipment_id.as_str()).collect();
        assert_eq!(ids, vec!["E3", "E2"]);
    }
}
