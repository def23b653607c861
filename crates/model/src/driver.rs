use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DriverId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

/// Invariant: only `Approved` drivers may transition to `Online`
/// or `OnTrip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Availability {
    Offline,
    Online,
    OnTrip,
}

impl Availability {
    /// The only availability values a driver's own client may request
    /// directly; `OnTrip` is only reachable
    /// through the acceptance coordinator or dispatch cancellation path.
    pub fn is_driver_settable(self) -> bool {
        matches!(self, Availability::Online | Availability::Offline)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: DriverId,
    pub user_id: UserId,
    pub name: String,
    pub approval_status: ApprovalStatus,
    pub availability: Availability,
    pub vehicle_type: String,
    pub fuel_type: String,
    pub capacity: i32,
    pub pet_friendly: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocation {
    pub driver_id: DriverId,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub accuracy: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStatusSnapshot {
    pub driver_id: DriverId,
    /// Wire name is `status`, matching the `GET /dispatch/status` response
    /// shape, even though the domain type is `Availability`.
    #[serde(rename = "status")]
    pub availability: Availability,
    pub approval_status: ApprovalStatus,
    pub location: Option<DriverLocation>,
}
