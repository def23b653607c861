use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DriverId, RideId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RideStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Invariant: `driver_id` is `Some` iff
/// `status in {Accepted, InProgress, Completed}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: RideId,
    pub passenger_id: UserId,
    pub pickup: Location,
    pub dropoff: Location,
    pub vehicle_type: String,
    pub total_fare: f64,
    pub currency: String,
    pub passenger_note: Option<String>,
    pub pickup_photo_url: Option<String>,
    pub status: RideStatus,
    pub driver_id: Option<DriverId>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<UserId>,
}

/// A new ride as submitted by the external ride-creation caller, before a
/// row or id exists for it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRide {
    pub passenger_id: UserId,
    pub pickup: Location,
    pub dropoff: Location,
    pub vehicle_type: String,
    pub total_fare: f64,
    pub currency: String,
    pub passenger_note: Option<String>,
    pub pickup_photo_url: Option<String>,
}
