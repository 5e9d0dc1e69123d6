//! PostgreSQL store
//!
//! Ledger rows are ordered by a `BIGSERIAL` sequence. Batches go through one
//! transaction so a swap becomes visible all at once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use super::{AuditLog, EquipmentRegistry, LedgerStore, UserRegistry};
use crate::models::{
    EquipmentStatus, EquipmentUnit, LoginAuditEntry, MaintenanceLogEntry, Role, TripRecord,
    UnknownLabel, User,
};
use crate::utils::errors::{conflict_error, AppError, AppResult};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations from `migrations/`.
    pub async fn migrate(pool: &PgPool) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(pool).await?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TripRow {
    trip_id: Option<String>,
    recorded_at: DateTime<Utc>,
    operator_username: String,
    driver_display_name: String,
    truck: String,
    trailer: String,
    equipment_id: String,
    route: String,
    zone: String,
    event_type: String,
    checkout_notes: String,
    check_in_zone: String,
    check_in_notes: String,
    plugged_in: Option<bool>,
    worked: Option<bool>,
    related_equipment_id: Option<String>,
    admin_override: bool,
}

impl TryFrom<TripRow> for TripRecord {
    type Error = AppError;

    fn try_from(row: TripRow) -> Result<Self, Self::Error> {
        let event_type = parse_label(&row.event_type)?;
        Ok(TripRecord {
            trip_id: row.trip_id,
            timestamp: row.recorded_at,
            operator_username: row.operator_username,
            driver_display_name: row.driver_display_name,
            truck: row.truck,
            trailer: row.trailer,
            equipment_id: row.equipment_id,
            route: row.route,
            zone: row.zone,
            event_type,
            checkout_notes: row.checkout_notes,
            check_in_zone: row.check_in_zone,
            check_in_notes: row.check_in_notes,
            plugged_in: row.plugged_in,
            worked: row.worked,
            related_equipment_id: row.related_equipment_id,
            admin_override: row.admin_override,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EquipmentRow {
    equipment_id: String,
    status: String,
    store_only: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    username: String,
    password_hash: String,
    role: String,
    carrier: String,
}

#[derive(Debug, sqlx::FromRow)]
struct MaintenanceRow {
    logged_at: DateTime<Utc>,
    equipment_id: String,
    action: String,
    reason: String,
    resolution: String,
}

fn parse_label<T>(value: &str) -> AppResult<T>
where
    T: std::str::FromStr<Err = UnknownLabel>,
{
    value.parse::<T>().map_err(|e| AppError::Internal(e.to_string()))
}

async fn insert_record<'e, E>(executor: E, record: &TripRecord) -> AppResult<()>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO trip_ledger (
            trip_id, recorded_at, operator_username, driver_display_name, truck, trailer,
            equipment_id, route, zone, event_type, checkout_notes, check_in_zone,
            check_in_notes, plugged_in, worked, related_equipment_id, admin_override
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(&record.trip_id)
    .bind(record.timestamp)
    .bind(&record.operator_username)
    .bind(&record.driver_display_name)
    .bind(&record.truck)
    .bind(&record.trailer)
    .bind(&record.equipment_id)
    .bind(&record.route)
    .bind(&record.zone)
    .bind(record.event_type.as_str())
    .bind(&record.checkout_notes)
    .bind(&record.check_in_zone)
    .bind(&record.check_in_notes)
    .bind(record.plugged_in)
    .bind(record.worked)
    .bind(&record.related_equipment_id)
    .bind(record.admin_override)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn append_batch(&self, records: Vec<TripRecord>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        for record in &records {
            insert_record(&mut *tx, record).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn records(&self) -> AppResult<Vec<TripRecord>> {
        let rows = sqlx::query_as::<_, TripRow>(
            r#"
            SELECT trip_id, recorded_at, operator_username, driver_display_name, truck, trailer,
                   equipment_id, route, zone, event_type, checkout_notes, check_in_zone,
                   check_in_notes, plugged_in, worked, related_equipment_id, admin_override
            FROM trip_ledger
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TripRecord::try_from).collect()
    }

    async fn set_worked(&self, trip_id: &str, worked: bool) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE trip_ledger SET worked = $2
            WHERE seq = (
                SELECT seq FROM trip_ledger
                WHERE trip_id = $1 AND event_type = 'Check-Out'
                ORDER BY seq DESC
                LIMIT 1
            )
            "#,
        )
        .bind(trip_id)
        .bind(worked)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EquipmentRegistry for PgStore {
    async fn list_equipment(&self) -> AppResult<Vec<EquipmentUnit>> {
        let rows = sqlx::query_as::<_, EquipmentRow>(
            "SELECT equipment_id, status, store_only FROM equipment_registry ORDER BY seq ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(EquipmentUnit {
                    equipment_id: row.equipment_id,
                    status: parse_label(&row.status)?,
                    store_only: row.store_only,
                })
            })
            .collect()
    }

    async fn add_equipment(&self, unit: EquipmentUnit) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO equipment_registry (equipment_id, status, store_only)
            VALUES ($1, $2, $3)
            ON CONFLICT (equipment_id) DO NOTHING
            "#,
        )
        .bind(&unit.equipment_id)
        .bind(unit.status.as_str())
        .bind(unit.store_only)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(conflict_error("EPJ", "id", &unit.equipment_id));
        }
        Ok(())
    }

    async fn remove_equipment(&self, equipment_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM equipment_registry WHERE equipment_id = $1")
            .bind(equipment_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_advisory_statuses(&self, statuses: &[(String, EquipmentStatus)]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        for (equipment_id, status) in statuses {
            sqlx::query("UPDATE equipment_registry SET status = $2 WHERE equipment_id = $1")
                .bind(equipment_id)
                .bind(status.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_zones(&self) -> AppResult<Vec<String>> {
        let zones: Vec<(String,)> = sqlx::query_as("SELECT name FROM zones ORDER BY seq ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(zones.into_iter().map(|(name,)| name).collect())
    }

    async fn add_zone(&self, zone: &str) -> AppResult<()> {
        sqlx::query("INSERT INTO zones (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(zone)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserRegistry for PgStore {
    async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT username, password_hash, role, carrier FROM users ORDER BY seq ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(User {
                    username: row.username,
                    password_hash: row.password_hash,
                    role: parse_label(&row.role)?,
                    carrier: row.carrier,
                })
            })
            .collect()
    }

    async fn insert_users(&self, users: Vec<User>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        for user in &users {
            sqlx::query(
                "INSERT INTO users (username, password_hash, role, carrier) VALUES ($1, $2, $3, $4)",
            )
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.carrier)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                let duplicate = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
                if duplicate {
                    conflict_error("User", "username", &user.username)
                } else {
                    AppError::Database(e)
                }
            })?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_profile(&self, username: &str, role: Role, carrier: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET role = $2, carrier = $3 WHERE LOWER(username) = LOWER($1)",
        )
        .bind(username)
        .bind(role.as_str())
        .bind(carrier)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_password_hash(&self, username: &str, password_hash: &str) -> AppResult<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, username: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AuditLog for PgStore {
    async fn record_login(&self, entry: LoginAuditEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO login_audit (logged_at, username, latitude, longitude, at_warehouse)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.timestamp)
        .bind(&entry.username)
        .bind(entry.latitude)
        .bind(entry.longitude)
        .bind(entry.at_warehouse)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_maintenance(&self, entry: MaintenanceLogEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO maintenance_log (logged_at, equipment_id, action, reason, resolution)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.timestamp)
        .bind(&entry.equipment_id)
        .bind(entry.action.as_str())
        .bind(&entry.reason)
        .bind(&entry.resolution)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_maintenance(&self, limit: usize) -> AppResult<Vec<MaintenanceLogEntry>> {
        let rows = sqlx::query_as::<_, MaintenanceRow>(
            r#"
            SELECT logged_at, equipment_id, action, reason, resolution
            FROM maintenance_log
            ORDER BY id DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(MaintenanceLogEntry {
                    timestamp: row.logged_at,
                    equipment_id: row.equipment_id,
                    action: parse_label(&row.action)?,
                    reason: row.reason,
                    resolution: row.resolution,
                })
            })
            .collect()
    }
}
