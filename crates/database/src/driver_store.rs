use async_trait::async_trait;
use dispatch::error::DispatchResult;
use dispatch::ports::DriverStore;
use model::driver::Availability;
use model::filters::{MatchFilters, NearbyDriver, EXTRA_PASSENGERS_MIN_CAPACITY};
use model::{Driver, DriverId, DriverLocation, UserId};
use utility::geo;

use crate::error::convert_error;
use crate::rows::{availability_str, DriverLocationRow, DriverRow, NearbyDriverRow};
use crate::PgDatabase;

#[async_trait]
impl DriverStore for PgDatabase {
    async fn get_driver(&self, driver_id: DriverId) -> DispatchResult<Option<Driver>> {
        sqlx::query_as::<_, DriverRow>(
            "SELECT id, user_id, name, approval_status, availability,
                    vehicle_type, fuel_type, capacity, pet_friendly
             FROM drivers WHERE id = $1",
        )
        .bind(driver_id.raw())
        .fetch_optional(&self.pool)
        .await
        .map_err(convert_error)
        .map(|row| row.map(DriverRow::into_model))
    }

    async fn find_driver_by_user_id(&self, user_id: UserId) -> DispatchResult<Option<Driver>> {
        sqlx::query_as::<_, DriverRow>(
            "SELECT id, user_id, name, approval_status, availability,
                    vehicle_type, fuel_type, capacity, pet_friendly
             FROM drivers WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(convert_error)
        .map(|row| row.map(DriverRow::into_model))
    }

    async fn set_availability(
        &self,
        driver_id: DriverId,
        availability: Availability,
    ) -> DispatchResult<()> {
        sqlx::query("UPDATE drivers SET availability = $1 WHERE id = $2")
            .bind(availability_str(availability))
            .bind(driver_id.raw())
            .execute(&self.pool)
            .await
            .map_err(convert_error)?;
        Ok(())
    }

    async fn try_set_availability(
        &self,
        driver_id: DriverId,
        expected: Availability,
        next: Availability,
    ) -> DispatchResult<bool> {
        let result = sqlx::query(
            "UPDATE drivers SET availability = $1
             WHERE id = $2 AND availability = $3",
        )
        .bind(availability_str(next))
        .bind(driver_id.raw())
        .bind(availability_str(expected))
        .execute(&self.pool)
        .await
        .map_err(convert_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert_location(&self, location: DriverLocation) -> DispatchResult<()> {
        sqlx::query(
            "INSERT INTO driver_locations
                (driver_id, latitude, longitude, heading, speed, accuracy, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (driver_id) DO UPDATE SET
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                heading = EXCLUDED.heading,
                speed = EXCLUDED.speed,
                accuracy = EXCLUDED.accuracy,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(location.driver_id.raw())
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(location.heading)
        .bind(location.speed)
        .bind(location.accuracy)
        .bind(location.updated_at)
        .execute(&self.pool)
        .await
        .map_err(convert_error)?;
        Ok(())
    }

    async fn get_location(&self, driver_id: DriverId) -> DispatchResult<Option<DriverLocation>> {
        sqlx::query_as::<_, DriverLocationRow>(
            "SELECT driver_id, latitude, longitude, heading, speed, accuracy, updated_at
             FROM driver_locations WHERE driver_id = $1",
        )
        .bind(driver_id.raw())
        .fetch_optional(&self.pool)
        .await
        .map_err(convert_error)
        .map(|row| row.map(DriverLocationRow::into_model))
    }

    /// Bounding-box prefilter plus an exact haversine `ORDER BY distance
    /// LIMIT`. `exclude` drops drivers already offered this ride in an
    /// earlier round straight out of the SQL rather than filtering the
    /// result in Rust.
    async fn find_nearby(
        &self,
        center_lat: f64,
        center_lon: f64,
        radius_meters: f64,
        limit: usize,
        filters: &MatchFilters,
        exclude: &[DriverId],
    ) -> DispatchResult<Vec<NearbyDriver>> {
        let radius_km = radius_meters / 1000.0;
        let ((min_lat, min_lon), (max_lat, max_lon)) =
            geo::calculate_bounding_box(center_lat, center_lon, radius_km);

        let exclude_ids: Vec<uuid::Uuid> = exclude.iter().map(|id| id.raw()).collect();

        sqlx::query_as::<_, NearbyDriverRow>(
            "WITH distance_calc AS (
                SELECT
                    d.id AS driver_id,
                    d.user_id,
                    d.name,
                    l.latitude,
                    l.longitude,
                    l.heading,
                    ($1 * ACOS(LEAST(1.0, GREATEST(-1.0,
                        COS(RADIANS($2)) * COS(RADIANS(l.latitude)) *
                        COS(RADIANS(l.longitude) - RADIANS($3)) +
                        SIN(RADIANS($2)) * SIN(RADIANS(l.latitude))
                    ))) * 1000.0) AS distance_meters
                FROM drivers d
                JOIN driver_locations l ON l.driver_id = d.id
                WHERE
                    d.availability = 'ONLINE'
                    AND d.approval_status = 'APPROVED'
                    AND l.latitude BETWEEN $4 AND $5
                    AND l.longitude BETWEEN $6 AND $7
                    AND NOT (d.id = ANY($8))
                    AND ($9::text IS NULL OR d.vehicle_type = $9)
                    AND ($10::text IS NULL OR d.fuel_type = $10)
                    AND ($11 = false OR d.pet_friendly = true)
                    AND ($12 = false OR d.capacity >= $13)
            )
            SELECT driver_id, user_id, name, latitude, longitude, heading, distance_meters
            FROM distance_calc
            WHERE distance_meters <= $14
            ORDER BY distance_meters ASC
            LIMIT $15",
        )
        .bind(geo::EARTH_RADIUS_KM)
        .bind(center_lat)
        .bind(center_lon)
        .bind(min_lat)
        .bind(max_lat)
        .bind(min_lon)
        .bind(max_lon)
        .bind(&exclude_ids)
        .bind(filters.vehicle_type_constraint())
        .bind(filters.fuel_type_constraint())
        .bind(filters.requires_pet_friendly())
        .bind(filters.requires_extra_passengers())
        .bind(EXTRA_PASSENGERS_MIN_CAPACITY)
        .bind(radius_meters)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(convert_error)
        .map(|rows| rows.into_iter().map(NearbyDriverRow::into_model).collect())
    }
}
