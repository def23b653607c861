use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use dispatch::controller::StartDispatch;
use dispatch::{CancelledBy, DispatchError};
use model::filters::MatchFilters;
use model::ride::{Location, NewRide, RideStatus};
use model::events::DriverLocationSummary;
use model::RideId;
use serde::{Deserialize, Serialize};

use crate::common::{AuthenticatedUser, RouteResult};
use crate::WebState;

pub fn routes() -> Router<Arc<WebState>> {
    Router::new()
        .route("/rides", post(create_ride))
        .route("/rides/:id/status", axum::routing::get(ride_status))
        .route("/rides/:id/accept", post(accept_ride))
        .route("/rides/:id/skip", post(skip_ride))
        .route("/rides/:id/cancel", post(cancel_ride))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRideRequest {
    pickup: Location,
    dropoff: Location,
    vehicle_type: String,
    total_fare: f64,
    currency: String,
    passenger_note: Option<String>,
    pickup_photo_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RideResponse {
    id: RideId,
    status: RideStatus,
}

/// Creates the `PENDING` ride row and kicks off dispatch fire-and-forget:
/// the actor mailbox accepts the `StartDispatch` message and round 1 runs
/// on its own task, so this handler never waits on dispatch outcomes.
async fn create_ride(
    State(state): State<Arc<WebState>>,
    AuthenticatedUser(passenger_id): AuthenticatedUser,
    Json(body): Json<CreateRideRequest>,
) -> RouteResult<Json<RideResponse>> {
    if !body.pickup.latitude.is_finite()
        || !body.pickup.longitude.is_finite()
        || !body.dropoff.latitude.is_finite()
        || !body.dropoff.longitude.is_finite()
    {
        return Err(DispatchError::BadRequest("pickup/dropoff coordinates must be finite".into()).into());
    }

    let ride = state
        .ride_store
        .create_ride(NewRide {
            passenger_id,
            pickup: body.pickup,
            dropoff: body.dropoff,
            vehicle_type: body.vehicle_type,
            total_fare: body.total_fare,
            currency: body.currency,
            passenger_note: body.passenger_note,
            pickup_photo_url: body.pickup_photo_url,
        })
        .await?;

    let response = RideResponse {
        id: ride.id,
        status: ride.status,
    };

    let _ = state
        .controller
        .tell(StartDispatch {
            ride,
            filters: MatchFilters::default(),
        })
        .await;

    Ok(Json(response))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RideStatusResponse {
    id: RideId,
    status: RideStatus,
    driver_name: Option<String>,
    driver_location: Option<DriverLocationSummary>,
}

async fn ride_status(
    State(state): State<Arc<WebState>>,
    Path(ride_id): Path<RideId>,
) -> RouteResult<Json<RideStatusResponse>> {
    let ride = state
        .ride_store
        .get_ride(ride_id)
        .await?
        .ok_or(DispatchError::NotFound)?;

    let (driver_name, driver_location) = match ride.driver_id {
        Some(driver_id) => {
            let driver = state.driver_state.get_status(driver_id).await?;
            let location = state.driver_state.location_summary(driver_id).await?;
            (Some(driver.name), location)
        }
        None => (None, None),
    };

    Ok(Json(RideStatusResponse {
        id: ride.id,
        status: ride.status,
        driver_name,
        driver_location,
    }))
}

async fn accept_ride(
    State(state): State<Arc<WebState>>,
    AuthenticatedUser(driver_user_id): AuthenticatedUser,
    Path(ride_id): Path<RideId>,
) -> RouteResult<Json<RideResponse>> {
    let driver = state.driver_state.find_by_user_id(driver_user_id).await?;
    let ride = state.acceptance.accept(ride_id, driver.id).await?;
    Ok(Json(RideResponse {
        id: ride.id,
        status: ride.status,
    }))
}

async fn skip_ride(
    State(state): State<Arc<WebState>>,
    AuthenticatedUser(driver_user_id): AuthenticatedUser,
    Path(ride_id): Path<RideId>,
) -> RouteResult<()> {
    let driver = state.driver_state.find_by_user_id(driver_user_id).await?;
    state.acceptance.skip(ride_id, driver.id).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelRideRequest {
    reason: Option<String>,
}

async fn cancel_ride(
    State(state): State<Arc<WebState>>,
    AuthenticatedUser(actor_user_id): AuthenticatedUser,
    Path(ride_id): Path<RideId>,
    Json(body): Json<CancelRideRequest>,
) -> RouteResult<Json<RideResponse>> {
    let existing = state
        .ride_store
        .get_ride(ride_id)
        .await?
        .ok_or(DispatchError::NotFound)?;

    let cancelled_by = match existing.driver_id {
        Some(driver_id) => {
            let driver = state.driver_state.get_status(driver_id).await?;
            if driver.user_id == actor_user_id {
                CancelledBy::Driver(driver_id)
            } else {
                CancelledBy::Passenger(actor_user_id)
            }
        }
        None => CancelledBy::Passenger(actor_user_id),
    };

    let ride = state
        .acceptance
        .cancel(ride_id, cancelled_by, body.reason)
        .await?;

    Ok(Json(RideResponse {
        id: ride.id,
        status: ride.status,
    }))
}
