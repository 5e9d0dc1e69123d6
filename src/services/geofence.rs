use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres.
const EARTH_RADIUS_METERS: f64 = 6_371e3;

/// Circle around the warehouse used to audit login positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

impl Default for Geofence {
    fn default() -> Self {
        Self {
            latitude: 39.58390517747175,
            longitude: -76.02613486224995,
            radius_meters: 500.0,
        }
    }
}

impl Geofence {
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        haversine_distance(latitude, longitude, self.latitude, self.longitude) <= self.radius_meters
    }
}

/// Great-circle distance in metres.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        assert_eq!(haversine_distance(10.0, 20.0, 10.0, 20.0), 0.0);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn test_warehouse_fence() {
        let fence = Geofence::default();
        assert!(fence.contains(39.5840, -76.0262));
        assert!(!fence.contains(39.60, -76.02));
    }
}
