//! Audit rows
//!
//! Login attempts and maintenance actions are written to their own
//! append-only tables, separate from the trip ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UnknownLabel;

/// One login attempt. Geofence result is informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginAuditEntry {
    pub timestamp: DateTime<Utc>,
    pub username: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub at_warehouse: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaintenanceAction {
    #[serde(rename = "Maintenance Start")]
    Start,
    #[serde(rename = "Maintenance End")]
    End,
}

impl MaintenanceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceAction::Start => "Maintenance Start",
            MaintenanceAction::End => "Maintenance End",
        }
    }
}

impl fmt::Display for MaintenanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaintenanceAction {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Maintenance Start" => Ok(MaintenanceAction::Start),
            "Maintenance End" => Ok(MaintenanceAction::End),
            other => Err(UnknownLabel::new("maintenance action", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceLogEntry {
    pub timestamp: DateTime<Utc>,
    pub equipment_id: String,
    pub action: MaintenanceAction,
    pub reason: String,
    pub resolution: String,
}
