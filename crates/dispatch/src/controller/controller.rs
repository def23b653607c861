use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use actors::actor::{Actor, SupervisionStrategy};
use actors::actor_ref::ActorRef;
use actors::handler::Handler;
use async_trait::async_trait;
use model::events::{self, NewRideRequestEvent, NoDriverFoundEvent, RideCancelledEvent};
use model::RideId;

use crate::config::{radius_for_round, round_count, DEFAULT_ROUND_LIMIT, ROUND_INTERVAL};
use crate::controller::messages::{Exhaust, RunRound, StartDispatch, StopDispatch};
use crate::controller::state::{ActiveDispatch, NotifiedDriver};
use crate::matching::MatchingService;
use crate::ports::{EventPublisher, RideStore};

/// Owns every ride currently being broadcast to drivers. A single instance
/// serializes all reads and writes of its `active` table through its actor
/// mailbox — concurrent `StartDispatch`/`RunRound`/`StopDispatch`
/// messages for different rides, or the same ride, are handled one at a
/// time in arrival order, so no `Mutex` guards this map.
pub struct DispatchController {
    self_ref: Arc<OnceLock<ActorRef<DispatchController>>>,
    matching: Arc<MatchingService>,
    ride_store: Arc<dyn RideStore>,
    events: Arc<dyn EventPublisher>,
    active: HashMap<RideId, ActiveDispatch>,
}

impl DispatchController {
    fn new(
        self_ref: Arc<OnceLock<ActorRef<DispatchController>>>,
        matching: Arc<MatchingService>,
        ride_store: Arc<dyn RideStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            self_ref,
            matching,
            ride_store,
            events,
            active: HashMap::new(),
        }
    }

    fn self_ref(&self) -> ActorRef<DispatchController> {
        self.self_ref
            .get()
            .cloned()
            .expect("self_ref is set immediately after the actor is spawned")
    }

    /// Runs one round for `ride_id`: widens the search radius, queries every
    /// driver not already offered this ride, and publishes a new-ride-request
    /// event to each. Schedules the next round, or the exhaustion grace
    /// timer once the last round has run.
    async fn run_round(&mut self, ride_id: RideId, round: usize) {
        if !self.active.contains_key(&ride_id) {
            tracing::debug!(%ride_id, round, "stale round timer, ride no longer active");
            return;
        }

        let Some(radius) = radius_for_round(round) else {
            tracing::warn!(%ride_id, round, "run_round called past the last round");
            return;
        };

        match self.ride_store.get_ride(ride_id).await {
            Ok(Some(ride)) if ride.status == model::ride::RideStatus::Pending => {}
            Ok(_) => {
                // Acceptance or an external cancel raced this round: the ride is
                // gone or has already moved out of PENDING. Drop the dispatch
                // without publishing anything further.
                self.active.remove(&ride_id);
                return;
            }
            Err(error) => {
                tracing::error!(%ride_id, round, %error, "ride re-check failed, abandoning dispatch");
                self.active.remove(&ride_id);
                return;
            }
        }

        // Re-check membership: cancel may have raced us while we awaited the
        // ride row above.
        let Some(dispatch) = self.active.get_mut(&ride_id) else {
            return;
        };

        let pickup = dispatch.ride.pickup.clone();
        let already_offered = dispatch.offered_driver_ids();
        let nearby = self
            .matching
            .find_nearby_excluding(
                pickup.latitude,
                pickup.longitude,
                radius,
                DEFAULT_ROUND_LIMIT,
                &dispatch.filters,
                &already_offered,
            )
            .await;

        let nearby = match nearby {
            Ok(nearby) => nearby,
            Err(error) => {
                tracing::error!(%ride_id, round, %error, "matching query failed, retrying next round");
                Vec::new()
            }
        };

        let event = NewRideRequestEvent {
            ride_id: dispatch.ride.id,
            pickup_address: dispatch.ride.pickup.address.clone(),
            pickup_lat: pickup.latitude,
            pickup_lng: pickup.longitude,
            dropoff_address: dispatch.ride.dropoff.address.clone(),
            dropoff_lat: dispatch.ride.dropoff.latitude,
            dropoff_lng: dispatch.ride.dropoff.longitude,
            estimated_fare: dispatch.ride.total_fare,
            currency: dispatch.ride.currency.clone(),
            vehicle_type: dispatch.ride.vehicle_type.clone(),
            passenger_note: dispatch.ride.passenger_note.clone(),
            pickup_photo_url: dispatch.ride.pickup_photo_url.clone(),
        };
        let payload = serde_json::to_value(&event).expect("NewRideRequestEvent always serializes");

        for driver in &nearby {
            dispatch.offered.push(NotifiedDriver {
                driver_id: driver.driver_id,
                user_id: driver.user_id,
            });
            let channel = events::driver_private_channel(driver.user_id);
            if let Err(error) = self
                .events
                .publish(&channel, events::EVENT_NEW_RIDE_REQUEST, payload.clone())
                .await
            {
                tracing::warn!(%ride_id, driver = %driver.driver_id, %error, "failed to publish new ride request");
            }
        }

        dispatch.round = round;

        let self_ref = self.self_ref();
        if round >= round_count() {
            tokio::spawn(async move {
                tokio::time::sleep(ROUND_INTERVAL).await;
                let _ = self_ref.tell(Exhaust { ride_id }).await;
            });
        } else {
            let next_round = round + 1;
            tokio::spawn(async move {
                tokio::time::sleep(ROUND_INTERVAL).await;
                let _ = self_ref.tell(RunRound { ride_id, round: next_round }).await;
            });
        }
    }

    /// Idempotent: disarms any in-flight timer (by removing the table entry
    /// that timer checks for) and broadcasts `ride_cancelled` to precisely
    /// the drivers in the notified set — no more, no fewer. A no-op if the
    /// ride is not (or no longer) active, so
    /// calling this twice, or calling it after exhaustion already removed
    /// the entry, is harmless.
    async fn cancel(&mut self, ride_id: RideId) {
        let Some(dispatch) = self.active.remove(&ride_id) else {
            return;
        };

        let event = RideCancelledEvent { ride_id };
        let payload = serde_json::to_value(&event).expect("RideCancelledEvent always serializes");

        for driver in &dispatch.offered {
            let channel = events::driver_private_channel(driver.user_id);
            if let Err(error) = self
                .events
                .publish(&channel, events::EVENT_RIDE_CANCELLED, payload.clone())
                .await
            {
                tracing::warn!(%ride_id, driver = %driver.driver_id, %error, "failed to publish ride cancelled event");
            }
        }
    }

    async fn exhaust(&mut self, ride_id: RideId) {
        let Some(dispatch) = self.active.remove(&ride_id) else {
            tracing::debug!(%ride_id, "stale exhaustion timer, ride no longer active");
            return;
        };

        // An acceptance (or an external cancel) may have raced the grace
        // timer: re-read the ride and bail out if it has already left
        // PENDING rather than blindly overwriting its status.
        match self.ride_store.get_ride(ride_id).await {
            Ok(Some(ride)) if ride.status == model::ride::RideStatus::Pending => {}
            Ok(_) => {
                tracing::debug!(%ride_id, "ride left PENDING before exhaustion fired, skipping");
                return;
            }
            Err(error) => {
                tracing::error!(%ride_id, %error, "ride re-check failed during exhaustion, abandoning");
                return;
            }
        }

        tracing::info!(%ride_id, "ride exhausted all dispatch rounds with no acceptance");

        if let Err(error) = self
            .ride_store
            .mark_cancelled(ride_id, dispatch.ride.passenger_id, Some("NO_DRIVERS_AVAILABLE".into()))
            .await
        {
            tracing::error!(%ride_id, %error, "failed to mark exhausted ride cancelled");
        }

        let event = NoDriverFoundEvent { ride_id };
        let payload = serde_json::to_value(&event).expect("NoDriverFoundEvent always serializes");
        let channel = events::rider_channel(dispatch.ride.passenger_id);
        if let Err(error) = self
            .events
            .publish(&channel, events::EVENT_NO_DRIVER_FOUND, payload)
            .await
        {
            tracing::warn!(%ride_id, %error, "failed to publish no_driver_found event");
        }
    }
}

impl Actor for DispatchController {
    fn on_fail(&mut self, error: Box<dyn std::any::Any + Send>) -> SupervisionStrategy {
        tracing::error!(?error, "dispatch controller handler panicked, resuming with current table");
        SupervisionStrategy::Resume
    }
}

#[async_trait]
impl Handler<StartDispatch> for DispatchController {
    async fn handle(&mut self, message: StartDispatch) {
        let ride_id = message.ride.id;
        self.active
            .insert(ride_id, ActiveDispatch::new(message.ride, message.filters));
        self.run_round(ride_id, 1).await;
    }
}

#[async_trait]
impl Handler<RunRound> for DispatchController {
    async fn handle(&mut self, message: RunRound) {
        self.run_round(message.ride_id, message.round).await;
    }
}

#[async_trait]
impl Handler<Exhaust> for DispatchController {
    async fn handle(&mut self, message: Exhaust) {
        self.exhaust(message.ride_id).await;
    }
}

#[async_trait]
impl Handler<StopDispatch> for DispatchController {
    async fn handle(&mut self, message: StopDispatch) {
        self.cancel(message.ride_id).await;
    }
}

/// Spawns the controller actor and wires its self-reference so round timers
/// can message it back. The actor framework's restart strategy constructs a
/// fresh actor on panic, so the self-ref cell is shared (not recreated) and
/// the dependencies it closes over are cheap `Arc` clones.
pub fn spawn(
    matching: Arc<MatchingService>,
    ride_store: Arc<dyn RideStore>,
    events: Arc<dyn EventPublisher>,
) -> ActorRef<DispatchController> {
    let self_ref_cell = Arc::new(OnceLock::new());
    let factory_cell = self_ref_cell.clone();
    let actor_ref = actors::run(move || {
        DispatchController::new(
            factory_cell.clone(),
            matching.clone(),
            ride_store.clone(),
            events.clone(),
        )
    });
    self_ref_cell
        .set(actor_ref.clone())
        .unwrap_or_else(|_| panic!("dispatch controller self_ref set twice"));
    actor_ref
}
