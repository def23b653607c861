use async_trait::async_trait;
use model::driver::Availability;
use model::filters::{MatchFilters, NearbyDriver};
use model::ride::NewRide;
use model::{Driver, DriverId, DriverLocation, Ride, RideId, UserId};

use crate::error::DispatchResult;

/// Persistence boundary for drivers and their location pings. Implemented by
/// `database::PgDatabase`; an in-memory fake backs the integration tests in
/// this crate.
#[async_trait]
pub trait DriverStore: Send + Sync {
    async fn get_driver(&self, driver_id: DriverId) -> DispatchResult<Option<Driver>>;

    /// Looks a driver up by the owning user id rather than their driver id.
    /// The only caller is the presence webhook path: the broker's
    /// `clientId` is the driver's user id, not the `DriverId` the
    /// dispatch-facing HTTP routes authenticate against.
    async fn find_driver_by_user_id(&self, user_id: UserId) -> DispatchResult<Option<Driver>>;

    /// Unconditional write, used for the driver-initiated
    /// `setAvailability(Online|Offline)` path.
    async fn set_availability(
        &self,
        driver_id: DriverId,
        availability: Availability,
    ) -> DispatchResult<()>;

    /// Conditional write: succeeds only if the driver's current availability
    /// equals `expected`. Used by the dispatch-owned transitions into and out
    /// of `OnTrip` so a concurrent driver-initiated change can't be
    /// clobbered. Returns `true` iff the row was updated.
    async fn try_set_availability(
        &self,
        driver_id: DriverId,
        expected: Availability,
        next: Availability,
    ) -> DispatchResult<bool>;

    async fn upsert_location(&self, location: DriverLocation) -> DispatchResult<()>;

    async fn get_location(&self, driver_id: DriverId) -> DispatchResult<Option<DriverLocation>>;

    /// Bounding-box prefiltered, haversine-ranked nearest-neighbour query,
    /// ascending by distance and truncated to `limit`. `exclude` holds
    /// drivers already offered this ride in an earlier round.
    async fn find_nearby(
        &self,
        center_lat: f64,
        center_lon: f64,
        radius_meters: f64,
        limit: usize,
        filters: &MatchFilters,
        exclude: &[DriverId],
    ) -> DispatchResult<Vec<NearbyDriver>>;
}

/// Persistence boundary for rides.
#[async_trait]
pub trait RideStore: Send + Sync {
    async fn create_ride(&self, new_ride: NewRide) -> DispatchResult<Ride>;

    async fn get_ride(&self, ride_id: RideId) -> DispatchResult<Option<Ride>>;

    /// Atomic acceptance boundary: succeeds only while the ride
    /// is still `PENDING` and undriven. Returns `true` iff this call won the
    /// race.
    async fn try_accept(&self, ride_id: RideId, driver_id: DriverId) -> DispatchResult<bool>;

    async fn mark_cancelled(
        &self,
        ride_id: RideId,
        cancelled_by: UserId,
        reason: Option<String>,
    ) -> DispatchResult<bool>;
}

/// Outbound realtime event boundary. A publish failure never aborts a
/// dispatch round; implementations log and return `Ok(())` for best-effort
/// delivery, reserving `Err` for failures the caller should still not treat
/// as fatal.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        channel: &str,
        event_name: &str,
        payload: serde_json::Value,
    ) -> DispatchResult<()>;
}
