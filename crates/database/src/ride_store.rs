use async_trait::async_trait;
use chrono::Utc;
use dispatch::error::DispatchResult;
use dispatch::ports::RideStore;
use model::ride::NewRide;
use model::{DriverId, Ride, RideId, UserId};
use uuid::Uuid;

use crate::error::convert_error;
use crate::rows::ride_status_str;
use crate::rows::RideRow;
use crate::PgDatabase;

#[async_trait]
impl RideStore for PgDatabase {
    async fn create_ride(&self, new_ride: NewRide) -> DispatchResult<Ride> {
        sqlx::query_as::<_, RideRow>(
            "INSERT INTO rides (
                id, passenger_id,
                pickup_address, pickup_latitude, pickup_longitude,
                dropoff_address, dropoff_latitude, dropoff_longitude,
                vehicle_type, total_fare, currency,
                passenger_note, pickup_photo_url,
                status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 'PENDING', $14)
            RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new_ride.passenger_id)
        .bind(&new_ride.pickup.address)
        .bind(new_ride.pickup.latitude)
        .bind(new_ride.pickup.longitude)
        .bind(&new_ride.dropoff.address)
        .bind(new_ride.dropoff.latitude)
        .bind(new_ride.dropoff.longitude)
        .bind(&new_ride.vehicle_type)
        .bind(new_ride.total_fare)
        .bind(&new_ride.currency)
        .bind(&new_ride.passenger_note)
        .bind(&new_ride.pickup_photo_url)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(convert_error)
        .map(RideRow::into_model)
    }

    async fn get_ride(&self, ride_id: RideId) -> DispatchResult<Option<Ride>> {
        sqlx::query_as::<_, RideRow>("SELECT * FROM rides WHERE id = $1")
            .bind(ride_id.raw())
            .fetch_optional(&self.pool)
            .await
            .map_err(convert_error)
            .map(|row| row.map(RideRow::into_model))
    }

    /// The acceptance race boundary: succeeds only while the
    /// ride is still `PENDING` and undriven, so `rows_affected() == 0` is
    /// exactly the "another driver already won" `Conflict` case, with no
    /// read-then-write window for two concurrent callers to both observe
    /// `PENDING`.
    async fn try_accept(&self, ride_id: RideId, driver_id: DriverId) -> DispatchResult<bool> {
        let result = sqlx::query(
            "UPDATE rides
             SET status = 'ACCEPTED', driver_id = $1, accepted_at = $2
             WHERE id = $3 AND status = 'PENDING' AND driver_id IS NULL",
        )
        .bind(driver_id.raw())
        .bind(Utc::now())
        .bind(ride_id.raw())
        .execute(&self.pool)
        .await
        .map_err(convert_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_cancelled(
        &self,
        ride_id: RideId,
        cancelled_by: UserId,
        reason: Option<String>,
    ) -> DispatchResult<bool> {
        let result = sqlx::query(
            "UPDATE rides
             SET status = $1, cancelled_at = $2, cancelled_by = $3, cancellation_reason = $4
             WHERE id = $5",
        )
        .bind(ride_status_str(model::ride::RideStatus::Cancelled))
        .bind(Utc::now())
        .bind(cancelled_by)
        .bind(reason)
        .bind(ride_id.raw())
        .execute(&self.pool)
        .await
        .map_err(convert_error)?;

        Ok(result.rows_affected() > 0)
    }
}
