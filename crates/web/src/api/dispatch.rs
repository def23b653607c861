use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use dispatch::DispatchError;
use model::driver::Availability;
use model::filters::MatchFilters;
use model::{DriverLocation, DriverStatusSnapshot};
use serde::{Deserialize, Serialize};

use crate::common::{AuthenticatedDriver, RouteResult};
use crate::WebState;

pub fn routes() -> Router<Arc<WebState>> {
    Router::new()
        .route("/dispatch/status", get(get_status).patch(set_status))
        .route("/dispatch/location", post(update_location))
        .route("/dispatch/nearby", get(nearby))
}

async fn get_status(
    State(state): State<Arc<WebState>>,
    AuthenticatedDriver(user_id): AuthenticatedDriver,
) -> RouteResult<Json<DriverStatusSnapshot>> {
    let driver = state.driver_state.find_by_user_id(user_id).await?;
    let location = state.driver_state.location_summary(driver.id).await?;
    Ok(Json(DriverStatusSnapshot {
        driver_id: driver.id,
        availability: driver.availability,
        approval_status: driver.approval_status,
        location: location.map(|summary| DriverLocation {
            driver_id: driver.id,
            latitude: summary.latitude,
            longitude: summary.longitude,
            heading: summary.heading,
            speed: None,
            accuracy: None,
            updated_at: Utc::now(),
        }),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetStatusRequest {
    status: Availability,
}

async fn set_status(
    State(state): State<Arc<WebState>>,
    AuthenticatedDriver(user_id): AuthenticatedDriver,
    Json(body): Json<SetStatusRequest>,
) -> RouteResult<()> {
    let driver = state.driver_state.find_by_user_id(user_id).await?;
    state
        .driver_state
        .set_availability(driver.id, body.status)
        .await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationUpdateRequest {
    latitude: f64,
    longitude: f64,
    heading: Option<f64>,
    speed: Option<f64>,
    accuracy: Option<f64>,
}

async fn update_location(
    State(state): State<Arc<WebState>>,
    AuthenticatedDriver(user_id): AuthenticatedDriver,
    Json(body): Json<LocationUpdateRequest>,
) -> RouteResult<()> {
    if !body.latitude.is_finite() || !body.longitude.is_finite() {
        return Err(DispatchError::BadRequest("latitude and longitude must be finite".into()).into());
    }

    let driver = state.driver_state.find_by_user_id(user_id).await?;
    state
        .driver_state
        .update_location(DriverLocation {
            driver_id: driver.id,
            latitude: body.latitude,
            longitude: body.longitude,
            heading: body.heading,
            speed: body.speed,
            accuracy: body.accuracy,
            updated_at: Utc::now(),
        })
        .await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NearbyParams {
    lat: f64,
    lng: f64,
    radius: f64,
    limit: Option<usize>,
    vehicle_type: Option<String>,
    fuel_type: Option<String>,
    pet_friendly: Option<bool>,
    extra_passengers: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NearbyResponse {
    count: usize,
    drivers: Vec<model::filters::NearbyDriver>,
}

const DEFAULT_NEARBY_LIMIT: usize = 25;

async fn nearby(
    State(state): State<Arc<WebState>>,
    Query(params): Query<NearbyParams>,
) -> RouteResult<Json<NearbyResponse>> {
    let filters = MatchFilters {
        vehicle_type: params.vehicle_type,
        fuel_type: params.fuel_type,
        pet_friendly: params.pet_friendly,
        extra_passengers: params.extra_passengers,
    };

    let drivers = state
        .matching
        .find_nearby(
            params.lat,
            params.lng,
            params.radius,
            params.limit.unwrap_or(DEFAULT_NEARBY_LIMIT),
            &filters,
        )
        .await?;

    Ok(Json(NearbyResponse {
        count: drivers.len(),
        drivers,
    }))
}
