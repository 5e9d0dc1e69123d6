//! Storage substrate
//!
//! Four narrow seams over the backing store. `MemoryStore` implements all of
//! them for single-process deployments and tests; `PgStore` implements them
//! over PostgreSQL. Services only ever see the traits.

pub mod memory_store;
pub mod postgres_store;

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::models::{
    EquipmentStatus, EquipmentUnit, LoginAuditEntry, MaintenanceLogEntry, Role, TripRecord, User,
};
use crate::utils::errors::AppResult;

pub use memory_store::MemoryStore;
pub use postgres_store::PgStore;

/// Ordered, append-only sequence of trip records.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Appends every record or none of them. Readers observe either the whole
    /// batch or nothing of it.
    async fn append_batch(&self, records: Vec<TripRecord>) -> AppResult<()>;

    async fn append(&self, record: TripRecord) -> AppResult<()> {
        self.append_batch(vec![record]).await
    }

    /// Snapshot of the ledger in append order.
    async fn records(&self) -> AppResult<Vec<TripRecord>>;

    /// Sets the `worked` annotation on the latest check-out of `trip_id`.
    /// Returns `false` when no such check-out exists.
    async fn set_worked(&self, trip_id: &str, worked: bool) -> AppResult<bool>;
}

/// Known units and zones.
#[async_trait]
pub trait EquipmentRegistry: Send + Sync {
    async fn list_equipment(&self) -> AppResult<Vec<EquipmentUnit>>;

    /// Fails with `Conflict` when the id is already registered.
    async fn add_equipment(&self, unit: EquipmentUnit) -> AppResult<()>;

    async fn remove_equipment(&self, equipment_id: &str) -> AppResult<bool>;

    /// Writes projected statuses back into the advisory column.
    async fn update_advisory_statuses(&self, statuses: &[(String, EquipmentStatus)]) -> AppResult<()>;

    async fn list_zones(&self) -> AppResult<Vec<String>>;

    async fn add_zone(&self, zone: &str) -> AppResult<()>;
}

/// User accounts. Usernames match case-insensitively.
#[async_trait]
pub trait UserRegistry: Send + Sync {
    async fn list_users(&self) -> AppResult<Vec<User>>;

    async fn insert_users(&self, users: Vec<User>) -> AppResult<()>;

    async fn update_profile(&self, username: &str, role: Role, carrier: &str) -> AppResult<bool>;

    async fn set_password_hash(&self, username: &str, password_hash: &str) -> AppResult<bool>;

    async fn delete_user(&self, username: &str) -> AppResult<bool>;
}

/// Append-only audit tables.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record_login(&self, entry: LoginAuditEntry) -> AppResult<()>;

    async fn record_maintenance(&self, entry: MaintenanceLogEntry) -> AppResult<()>;

    /// Latest entries, newest first.
    async fn recent_maintenance(&self, limit: usize) -> AppResult<Vec<MaintenanceLogEntry>>;
}

/// Handles to every store, injected into the services.
#[derive(Clone)]
pub struct Repositories {
    pub ledger: Arc<dyn LedgerStore>,
    pub equipment: Arc<dyn EquipmentRegistry>,
    pub users: Arc<dyn UserRegistry>,
    pub audit: Arc<dyn AuditLog>,
}

impl Repositories {
    /// One backend serving every seam.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: LedgerStore + EquipmentRegistry + UserRegistry + AuditLog + 'static,
    {
        Self {
            ledger: store.clone(),
            equipment: store.clone(),
            users: store.clone(),
            audit: store,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::default()))
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }
}
