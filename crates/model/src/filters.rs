use serde::{Deserialize, Serialize};

use crate::{DriverId, UserId};

/// Matching filters. `"ANY"` or an absent value means "no
/// constraint" for the string-valued filters.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFilters {
    pub vehicle_type: Option<String>,
    pub fuel_type: Option<String>,
    pub pet_friendly: Option<bool>,
    pub extra_passengers: Option<bool>,
}

impl MatchFilters {
    fn constraint(value: &Option<String>) -> Option<&str> {
        match value.as_deref() {
            None | Some("ANY") | Some("") => None,
            Some(other) => Some(other),
        }
    }

    pub fn vehicle_type_constraint(&self) -> Option<&str> {
        Self::constraint(&self.vehicle_type)
    }

    pub fn fuel_type_constraint(&self) -> Option<&str> {
        Self::constraint(&self.fuel_type)
    }

    pub fn requires_pet_friendly(&self) -> bool {
        self.pet_friendly.unwrap_or(false)
    }

    pub fn requires_extra_passengers(&self) -> bool {
        self.extra_passengers.unwrap_or(false)
    }
}

/// Minimum seat capacity implied by `extraPassengers == true`.
pub const EXTRA_PASSENGERS_MIN_CAPACITY: i32 = 5;

/// One row of a matching query result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyDriver {
    pub driver_id: DriverId,
    pub user_id: UserId,
    pub driver_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: Option<f64>,
    pub distance_meters: f64,
}
