use chrono::{DateTime, Utc};
use model::driver::{ApprovalStatus, Availability};
use model::ride::RideStatus;
use model::{Driver, DriverLocation, Ride};
use sqlx::FromRow;
use utility::id::Id;

#[derive(Debug, FromRow)]
pub(crate) struct DriverRow {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub name: String,
    pub approval_status: String,
    pub availability: String,
    pub vehicle_type: String,
    pub fuel_type: String,
    pub capacity: i32,
    pub pet_friendly: bool,
}

impl DriverRow {
    pub(crate) fn into_model(self) -> Driver {
        Driver {
            id: Id::new(self.id),
            user_id: self.user_id,
            name: self.name,
            approval_status: parse_approval_status(&self.approval_status),
            availability: parse_availability(&self.availability),
            vehicle_type: self.vehicle_type,
            fuel_type: self.fuel_type,
            capacity: self.capacity,
            pet_friendly: self.pet_friendly,
        }
    }
}

fn parse_approval_status(raw: &str) -> ApprovalStatus {
    match raw {
        "PENDING" => ApprovalStatus::Pending,
        "APPROVED" => ApprovalStatus::Approved,
        "REJECTED" => ApprovalStatus::Rejected,
        "SUSPENDED" => ApprovalStatus::Suspended,
        other => unreachable!("approval_status check constraint admits only the four known values, got {other}"),
    }
}

fn parse_availability(raw: &str) -> Availability {
    match raw {
        "OFFLINE" => Availability::Offline,
        "ONLINE" => Availability::Online,
        "ONTRIP" => Availability::OnTrip,
        other => unreachable!("availability check constraint admits only the three known values, got {other}"),
    }
}

pub(crate) fn availability_str(availability: Availability) -> &'static str {
    match availability {
        Availability::Offline => "OFFLINE",
        Availability::Online => "ONLINE",
        Availability::OnTrip => "ONTRIP",
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct DriverLocationRow {
    pub driver_id: uuid::Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub accuracy: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl DriverLocationRow {
    pub(crate) fn into_model(self) -> DriverLocation {
        DriverLocation {
            driver_id: Id::new(self.driver_id),
            latitude: self.latitude,
            longitude: self.longitude,
            heading: self.heading,
            speed: self.speed,
            accuracy: self.accuracy,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct NearbyDriverRow {
    pub driver_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: Option<f64>,
    pub distance_meters: f64,
}

impl NearbyDriverRow {
    pub(crate) fn into_model(self) -> model::filters::NearbyDriver {
        model::filters::NearbyDriver {
            driver_id: Id::new(self.driver_id),
            user_id: self.user_id,
            driver_name: self.name,
            latitude: self.latitude,
            longitude: self.longitude,
            heading: self.heading,
            distance_meters: self.distance_meters,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct RideRow {
    pub id: uuid::Uuid,
    pub passenger_id: uuid::Uuid,
    pub pickup_address: String,
    pub pickup_latitude: f64,
    pub pickup_longitude: f64,
    pub dropoff_address: String,
    pub dropoff_latitude: f64,
    pub dropoff_longitude: f64,
    pub vehicle_type: String,
    pub total_fare: f64,
    pub currency: String,
    pub passenger_note: Option<String>,
    pub pickup_photo_url: Option<String>,
    pub status: String,
    pub driver_id: Option<uuid::Uuid>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<uuid::Uuid>,
}

impl RideRow {
    pub(crate) fn into_model(self) -> Ride {
        Ride {
            id: Id::new(self.id),
            passenger_id: self.passenger_id,
            pickup: model::ride::Location {
                address: self.pickup_address,
                latitude: self.pickup_latitude,
                longitude: self.pickup_longitude,
            },
            dropoff: model::ride::Location {
                address: self.dropoff_address,
                latitude: self.dropoff_latitude,
                longitude: self.dropoff_longitude,
            },
            vehicle_type: self.vehicle_type,
            total_fare: self.total_fare,
            currency: self.currency,
            passenger_note: self.passenger_note,
            pickup_photo_url: self.pickup_photo_url,
            status: parse_ride_status(&self.status),
            driver_id: self.driver_id.map(Id::new),
            created_at: self.created_at,
            accepted_at: self.accepted_at,
            cancelled_at: self.cancelled_at,
            completed_at: self.completed_at,
            cancellation_reason: self.cancellation_reason,
            cancelled_by: self.cancelled_by,
        }
    }
}

fn parse_ride_status(raw: &str) -> RideStatus {
    match raw {
        "PENDING" => RideStatus::Pending,
        "ACCEPTED" => RideStatus::Accepted,
        "INPROGRESS" => RideStatus::InProgress,
        "COMPLETED" => RideStatus::Completed,
        "CANCELLED" => RideStatus::Cancelled,
        other => unreachable!("status check constraint admits only the five known values, got {other}"),
    }
}

pub(crate) fn ride_status_str(status: RideStatus) -> &'static str {
    match status {
        RideStatus::Pending => "PENDING",
        RideStatus::Accepted => "ACCEPTED",
        RideStatus::InProgress => "INPROGRESS",
        RideStatus::Completed => "COMPLETED",
        RideStatus::Cancelled => "CANCELLED",
    }
}

