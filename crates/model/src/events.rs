//! Payload shapes for the pub/sub event channels. Each constant
//! channel-name helper mirrors the naming the realtime broker expects;
//! the payload structs are serialized with `serde_json::to_value` by
//! whichever component emits them.

use serde::Serialize;

use crate::{DriverId, RideId, UserId};

pub fn rider_channel(passenger_id: UserId) -> String {
    format!("rider:{passenger_id}")
}

pub fn driver_private_channel(user_id: UserId) -> String {
    format!("driver:private:{user_id}")
}

pub const EVENT_NEW_RIDE_REQUEST: &str = "new_ride_request";
pub const EVENT_RIDE_CANCELLED: &str = "ride_cancelled";
pub const EVENT_RIDE_ACCEPTED: &str = "ride_accepted";
pub const EVENT_RIDE_CANCELLED_BY_DRIVER: &str = "ride_cancelled_by_driver";
pub const EVENT_NO_DRIVER_FOUND: &str = "no_driver_found";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRideRequestEvent {
    pub ride_id: RideId,
    pub pickup_address: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_address: String,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub estimated_fare: f64,
    pub currency: String,
    pub vehicle_type: String,
    pub passenger_note: Option<String>,
    pub pickup_photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideCancelledEvent {
    pub ride_id: RideId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocationSummary {
    pub latitude: f64,
    pub longitude: f64,
    pub heading: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideAcceptedEvent {
    pub ride_id: RideId,
    pub driver_id: DriverId,
    pub driver_name: String,
    pub driver_location: Option<DriverLocationSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoDriverFoundEvent {
    pub ride_id: RideId,
}
