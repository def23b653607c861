use std::sync::Arc;

use actors::actor_ref::ActorRef;
use model::driver::Availability;
use model::events::{self, RideAcceptedEvent, RideCancelledEvent};
use model::ride::RideStatus;
use model::{DriverId, Ride, RideId, UserId};

use crate::controller::{DispatchController, StopDispatch};
use crate::driver_state::DriverStateService;
use crate::error::{DispatchError, DispatchResult};
use crate::ports::{EventPublisher, RideStore};

/// Identifies which party is cancelling a ride, already authenticated by the
/// caller. A driver is identified by `DriverId` rather than `UserId` since
/// that's the identity the dispatch-facing endpoints authenticate against;
/// this crate resolves it to the driver's `user_id` only when it needs the
/// audit trail on [`model::Ride::cancelled_by`].
#[derive(Debug, Clone, Copy)]
pub enum CancelledBy {
    Passenger(UserId),
    Driver(DriverId),
}

/// Implements the acceptance race and the cancellation paths. `try_accept`
/// is the only place a ride moves out of `PENDING`; everything else here
/// reacts to that outcome.
pub struct AcceptanceCoordinator {
    ride_store: Arc<dyn RideStore>,
    driver_state: Arc<DriverStateService>,
    events: Arc<dyn EventPublisher>,
    controller: ActorRef<DispatchController>,
}

impl AcceptanceCoordinator {
    pub fn new(
        ride_store: Arc<dyn RideStore>,
        driver_state: Arc<DriverStateService>,
        events: Arc<dyn EventPublisher>,
        controller: ActorRef<DispatchController>,
    ) -> Self {
        Self {
            ride_store,
            driver_state,
            events,
            controller,
        }
    }

    /// Accepts `ride_id` on behalf of `driver_id`. Returns `Conflict` if
    /// another driver already won the race or the ride is no longer
    /// pending; the conditional update in the store is what makes this
    /// race-free, not any lock held here.
    pub async fn accept(&self, ride_id: RideId, driver_id: DriverId) -> DispatchResult<Ride> {
        let won = self.ride_store.try_accept(ride_id, driver_id).await?;
        if !won {
            return Err(DispatchError::Conflict(
                "ride is no longer available".into(),
            ));
        }

        if !self
            .driver_state
            .set_availability_internal(driver_id, Availability::Online, Availability::OnTrip)
            .await?
        {
            tracing::warn!(%ride_id, %driver_id, "driver availability changed out from under a won acceptance");
        }

        let _ = self.controller.tell(StopDispatch { ride_id }).await;

        let ride = self
            .ride_store
            .get_ride(ride_id)
            .await?
            .ok_or(DispatchError::NotFound)?;

        let driver = self.driver_state.get_status(driver_id).await?;
        let location = self.driver_state.location_summary(driver_id).await?;

        let event = RideAcceptedEvent {
            ride_id,
            driver_id,
            driver_name: driver.name.clone(),
            driver_location: location,
        };
        let payload = serde_json::to_value(&event).expect("RideAcceptedEvent always serializes");
        let channel = events::rider_channel(ride.passenger_id);
        if let Err(error) = self
            .events
            .publish(&channel, events::EVENT_RIDE_ACCEPTED, payload)
            .await
        {
            tracing::warn!(%ride_id, %error, "failed to publish ride accepted event");
        }

        Ok(ride)
    }

    /// Declines an offered ride. The controller's own offered-driver list
    /// already excludes this driver from future rounds for this ride once it
    /// has been offered to them at all, so there is nothing further to
    /// record here beyond validating the ride exists.
    pub async fn skip(&self, ride_id: RideId, _driver_id: DriverId) -> DispatchResult<()> {
        self.ride_store
            .get_ride(ride_id)
            .await?
            .ok_or(DispatchError::NotFound)?;
        Ok(())
    }

    pub async fn cancel(
        &self,
        ride_id: RideId,
        by: CancelledBy,
        reason: Option<String>,
    ) -> DispatchResult<Ride> {
        let ride = self
            .ride_store
            .get_ride(ride_id)
            .await?
            .ok_or(DispatchError::NotFound)?;

        if !matches!(ride.status, RideStatus::Pending | RideStatus::Accepted) {
            return Err(DispatchError::BadRequest(
                "only pending or accepted rides can be cancelled".into(),
            ));
        }

        let is_driver = matches!(by, CancelledBy::Driver(_));
        let cancelled_by_user = match by {
            CancelledBy::Passenger(user_id) => {
                if ride.passenger_id != user_id {
                    return Err(DispatchError::Forbidden(
                        "only the requesting passenger may cancel this ride".into(),
                    ));
                }
                user_id
            }
            CancelledBy::Driver(driver_id) => {
                if ride.driver_id != Some(driver_id) {
                    return Err(DispatchError::Forbidden(
                        "only the assigned driver may cancel this ride".into(),
                    ));
                }
                self.driver_state.get_status(driver_id).await?.user_id
            }
        };

        // A caller-supplied `NO_DRIVERS_AVAILABLE` reason passes through
        // unchanged; any other reason is replaced with the attributed one
        // rather than trusted verbatim from the request body.
        let cancellation_reason = match reason.as_deref() {
            Some("NO_DRIVERS_AVAILABLE") => "NO_DRIVERS_AVAILABLE".to_string(),
            _ if is_driver => "DRIVER_CANCELLED".to_string(),
            _ => "USER_CANCELLED".to_string(),
        };

        self.ride_store
            .mark_cancelled(ride_id, cancelled_by_user, Some(cancellation_reason))
            .await?;

        let _ = self.controller.tell(StopDispatch { ride_id }).await;

        if let Some(driver_id) = ride.driver_id {
            if !self
                .driver_state
                .set_availability_internal(driver_id, Availability::OnTrip, Availability::Online)
                .await?
            {
                tracing::warn!(%ride_id, %driver_id, "driver availability changed out from under a cancellation");
            }

            let event = RideCancelledEvent { ride_id };
            let payload = serde_json::to_value(&event).expect("RideCancelledEvent always serializes");

            match by {
                CancelledBy::Driver(_) => {
                    let channel = events::rider_channel(ride.passenger_id);
                    let _ = self
                        .events
                        .publish(&channel, events::EVENT_RIDE_CANCELLED_BY_DRIVER, payload)
                        .await;
                }
                CancelledBy::Passenger(_) => {
                    let driver = self.driver_state.get_status(driver_id).await?;
                    let channel = events::driver_private_channel(driver.user_id);
                    let _ = self
                        .events
                        .publish(&channel, events::EVENT_RIDE_CANCELLED, payload)
                        .await;
                }
            }
        }

        self.ride_store
            .get_ride(ride_id)
            .await?
            .ok_or(DispatchError::NotFound)
    }
}
