use serde::Deserialize;
use validator::Validate;

use crate::models::{EquipmentStatus, MaintenanceAction};
use crate::utils::validation::validate_not_blank;

#[derive(Debug, Deserialize, Validate)]
pub struct LocationUpdateRequest {
    #[validate(length(min = 1, max = 64), custom = "validate_not_blank")]
    pub equipment_id: String,

    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub new_location: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForceCheckInRequest {
    #[validate(length(min = 1))]
    pub trip_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MaintenanceRequest {
    #[validate(length(min = 1, max = 64))]
    pub equipment_id: String,

    pub action: MaintenanceAction,

    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OverrideStatusRequest {
    #[validate(length(min = 1, max = 64))]
    pub equipment_id: String,

    pub status: EquipmentStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WorkedRequest {
    #[validate(length(min = 1))]
    pub trip_id: String,

    pub worked: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddEquipmentRequest {
    #[validate(length(min = 1, max = 64), custom = "validate_not_blank")]
    pub equipment_id: String,

    #[serde(default)]
    pub store_only: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddZoneRequest {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub name: String,
}
