use std::sync::Arc;

use model::driver::{ApprovalStatus, Availability};
use model::{Driver, DriverId, DriverLocation, UserId};

use crate::error::{DispatchError, DispatchResult};
use crate::ports::DriverStore;

/// Owns every transition of a driver's availability. The
/// dispatch-initiated transitions (`OnTrip` on acceptance, `Online` on
/// cancellation) go through [`DriverStateService::set_availability_internal`]
/// and race-check the prior state with [`DriverStore::try_set_availability`]
/// rather than blindly overwriting it.
pub struct DriverStateService {
    store: Arc<dyn DriverStore>,
}

impl DriverStateService {
    pub fn new(store: Arc<dyn DriverStore>) -> Self {
        Self { store }
    }

    pub async fn get_status(&self, driver_id: DriverId) -> DispatchResult<Driver> {
        self.store
            .get_driver(driver_id)
            .await?
            .ok_or(DispatchError::NotFound)
    }

    /// Resolves a driver by the owning user id, the identity the
    /// dispatch-facing HTTP routes authenticate against. Used by the web
    /// layer to turn an authenticated driver session into the `DriverId`
    /// the rest of this crate's API expects.
    pub async fn find_by_user_id(&self, user_id: UserId) -> DispatchResult<Driver> {
        self.store
            .find_driver_by_user_id(user_id)
            .await?
            .ok_or(DispatchError::NotFound)
    }

    /// Driver-initiated availability change. Only `Online` and
    /// `Offline` are reachable this way; `OnTrip` is dispatch-owned.
    pub async fn set_availability(
        &self,
        driver_id: DriverId,
        requested: Availability,
    ) -> DispatchResult<()> {
        if !requested.is_driver_settable() {
            return Err(DispatchError::Forbidden(
                "availability must be ONLINE or OFFLINE".into(),
            ));
        }

        let driver = self
            .store
            .get_driver(driver_id)
            .await?
            .ok_or(DispatchError::NotFound)?;

        if !matches!(driver.approval_status, model::driver::ApprovalStatus::Approved) {
            return Err(DispatchError::Forbidden(
                "driver is not approved".into(),
            ));
        }

        if matches!(driver.availability, Availability::OnTrip) {
            return Err(DispatchError::BadRequest(
                "driver is currently on a trip".into(),
            ));
        }

        self.store.set_availability(driver_id, requested).await
    }

    /// Presence-webhook-driven mirror of `set_availability`, keyed by the
    /// broker's `clientId` (the driver's `user_id`) rather than `DriverId`.
    /// Never fails: an unknown `clientId`, a non-`APPROVED` driver, or a
    /// driver currently `OnTrip` is logged by the caller and skipped here
    /// rather than raised, per the presence sink's "must not throw"
    /// contract — the broker retries on error and a thrown error here would
    /// only amplify its noise.
    pub async fn set_availability_from_presence(
        &self,
        user_id: UserId,
        online: bool,
    ) -> DispatchResult<()> {
        let driver = match self.store.find_driver_by_user_id(user_id).await? {
            Some(driver) => driver,
            None => return Ok(()),
        };

        if !matches!(driver.approval_status, ApprovalStatus::Approved) {
            return Ok(());
        }

        if matches!(driver.availability, Availability::OnTrip) {
            return Ok(());
        }

        let next = if online {
            Availability::Online
        } else {
            Availability::Offline
        };

        if next == driver.availability {
            return Ok(());
        }

        self.store.set_availability(driver.id, next).await
    }

    /// Dispatch-owned transition, race-checked against `expected`. Returns
    /// `false` if another writer already moved the driver out of `expected`.
    pub async fn set_availability_internal(
        &self,
        driver_id: DriverId,
        expected: Availability,
        next: Availability,
    ) -> DispatchResult<bool> {
        self.store
            .try_set_availability(driver_id, expected, next)
            .await
    }

    pub async fn update_location(&self, location: DriverLocation) -> DispatchResult<()> {
        let driver = self
            .store
            .get_driver(location.driver_id)
            .await?
            .ok_or(DispatchError::NotFound)?;

        if !matches!(driver.approval_status, ApprovalStatus::Approved) {
            return Err(DispatchError::Forbidden("driver is not approved".into()));
        }

        self.store.upsert_location(location).await
    }

    /// The driver's last known location, summarized for inclusion in the
    /// ride-accepted event payload. `None` if the driver has never
    /// pinged a location.
    pub async fn location_summary(
        &self,
        driver_id: DriverId,
    ) -> DispatchResult<Option<model::events::DriverLocationSummary>> {
        let location = self.store.get_location(driver_id).await?;
        Ok(location.map(|location| model::events::DriverLocationSummary {
            latitude: location.latitude,
            longitude: location.longitude,
            heading: location.heading,
        }))
    }
}
