use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::{CheckInReport, CheckoutTarget, SwapRequest, TripDetails};
use crate::utils::errors::{bad_request_error, AppResult};
use crate::utils::validation::validate_not_blank;

/// Checkout of a named unit, or an overspill trip with no unit.
#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, max = 64))]
    pub equipment_id: Option<String>,

    #[serde(default)]
    pub overspill: bool,

    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub driver_name: String,

    #[serde(default)]
    pub truck: String,

    #[serde(default)]
    pub trailer: String,

    #[serde(default)]
    pub route: String,

    #[serde(default)]
    pub fault_report: String,
}

impl CheckoutRequest {
    pub fn into_parts(self) -> AppResult<(CheckoutTarget, TripDetails)> {
        let target = match (self.overspill, self.equipment_id) {
            (true, _) => CheckoutTarget::Overspill,
            (false, Some(id)) if !id.trim().is_empty() => CheckoutTarget::Unit(id.trim().to_string()),
            (false, _) => return Err(bad_request_error("Select an EPJ or choose overspill.")),
        };
        let details = TripDetails {
            driver_name: self.driver_name.trim().to_string(),
            truck: self.truck.trim().to_string(),
            trailer: self.trailer.trim().to_string(),
            route: self.route.trim().to_string(),
            fault_report: self.fault_report.trim().to_string(),
        };
        Ok((target, details))
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CheckInRequest {
    #[serde(default)]
    #[validate(length(max = 100))]
    pub check_in_zone: String,

    #[serde(default)]
    pub fault_report: String,

    pub plugged_in: Option<bool>,
}

impl From<CheckInRequest> for CheckInReport {
    fn from(request: CheckInRequest) -> Self {
        Self {
            check_in_zone: request.check_in_zone.trim().to_string(),
            fault_report: request.fault_report.trim().to_string(),
            plugged_in: request.plugged_in,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SwapEquipmentRequest {
    pub trip_id: Option<String>,

    #[validate(length(min = 1, max = 64), custom = "validate_not_blank")]
    pub new_equipment_id: String,

    #[serde(default)]
    pub check_in_zone: String,

    pub maintenance_reason: Option<String>,
}

impl From<SwapEquipmentRequest> for SwapRequest {
    fn from(request: SwapEquipmentRequest) -> Self {
        Self {
            trip_id: request.trip_id.filter(|id| !id.trim().is_empty()),
            new_equipment_id: request.new_equipment_id,
            check_in_zone: request.check_in_zone.trim().to_string(),
            maintenance_reason: request.maintenance_reason,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TripResponse {
    pub trip_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(equipment_id: Option<&str>, overspill: bool) -> CheckoutRequest {
        CheckoutRequest {
            equipment_id: equipment_id.map(str::to_string),
            overspill,
            driver_name: " Alice ".to_string(),
            truck: String::new(),
            trailer: String::new(),
            route: String::new(),
            fault_report: String::new(),
        }
    }

    #[test]
    fn test_checkout_target_selection() {
        let (target, details) = request(Some("E1"), false).into_parts().unwrap();
        assert_eq!(target, CheckoutTarget::Unit("E1".to_string()));
        assert_eq!(details.driver_name, "Alice");

        let (target, _) = request(Some("E1"), true).into_parts().unwrap();
        assert_eq!(target, CheckoutTarget::Overspill);

        assert!(request(None, false).into_parts().is_err());
        assert!(request(Some("  "), false).into_parts().is_err());
    }
}
