//! End-to-end scenarios against the dispatch controller, acceptance
//! coordinator and driver state service wired together with in-memory
//! fakes for the three store/publisher ports. Exercises the actor through
//! its real mailbox rather than calling `DispatchController`'s private
//! methods directly, so these tests see exactly what a production caller
//! sees.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dispatch::controller::{spawn, Exhaust, StartDispatch};
use dispatch::ports::{DriverStore, EventPublisher, RideStore};
use dispatch::{AcceptanceCoordinator, CancelledBy, DriverStateService, MatchingService};
use model::driver::{ApprovalStatus, Availability};
use model::filters::{MatchFilters, NearbyDriver};
use model::ride::{Location, NewRide, RideStatus};
use model::{Driver, DriverId, DriverLocation, Ride, RideId, UserId};
use utility::geo::haversine_distance;
use utility::id::Id;
use uuid::Uuid;

#[derive(Default)]
struct FakeDriverStore {
    drivers: Mutex<HashMap<DriverId, Driver>>,
    locations: Mutex<HashMap<DriverId, DriverLocation>>,
}

impl FakeDriverStore {
    fn insert(&self, driver: Driver, location: Option<(f64, f64)>) {
        let id = driver.id;
        self.drivers.lock().unwrap().insert(id, driver);
        if let Some((lat, lng)) = location {
            self.locations.lock().unwrap().insert(
                id,
                DriverLocation {
                    driver_id: id,
                    latitude: lat,
                    longitude: lng,
                    heading: None,
                    speed: None,
                    accuracy: None,
                    updated_at: Utc::now(),
                },
            );
        }
    }
}

#[async_trait]
impl DriverStore for FakeDriverStore {
    async fn get_driver(&self, driver_id: DriverId) -> dispatch::DispatchResult<Option<Driver>> {
        Ok(self.drivers.lock().unwrap().get(&driver_id).cloned())
    }

    async fn find_driver_by_user_id(
        &self,
        user_id: UserId,
    ) -> dispatch::DispatchResult<Option<Driver>> {
        Ok(self
            .drivers
            .lock()
            .unwrap()
            .values()
            .find(|d| d.user_id == user_id)
            .cloned())
    }

    async fn set_availability(
        &self,
        driver_id: DriverId,
        availability: Availability,
    ) -> dispatch::DispatchResult<()> {
        if let Some(driver) = self.drivers.lock().unwrap().get_mut(&driver_id) {
            driver.availability = availability;
        }
        Ok(())
    }

    async fn try_set_availability(
        &self,
        driver_id: DriverId,
        expected: Availability,
        next: Availability,
    ) -> dispatch::DispatchResult<bool> {
        let mut drivers = self.drivers.lock().unwrap();
        match drivers.get_mut(&driver_id) {
            Some(driver) if driver.availability == expected => {
                driver.availability = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_location(&self, location: DriverLocation) -> dispatch::DispatchResult<()> {
        self.locations
            .lock()
            .unwrap()
            .insert(location.driver_id, location);
        Ok(())
    }

    async fn get_location(
        &self,
        driver_id: DriverId,
    ) -> dispatch::DispatchResult<Option<DriverLocation>> {
        Ok(self.locations.lock().unwrap().get(&driver_id).cloned())
    }

    async fn find_nearby(
        &self,
        center_lat: f64,
        center_lon: f64,
        radius_meters: f64,
        limit: usize,
        filters: &MatchFilters,
        exclude: &[DriverId],
    ) -> dispatch::DispatchResult<Vec<NearbyDriver>> {
        let drivers = self.drivers.lock().unwrap();
        let locations = self.locations.lock().unwrap();

        let mut candidates: Vec<NearbyDriver> = drivers
            .values()
            .filter(|d| d.availability == Availability::Online)
            .filter(|d| d.approval_status == ApprovalStatus::Approved)
            .filter(|d| !exclude.contains(&d.id))
            .filter_map(|d| {
                let location = locations.get(&d.id)?;
                let distance_km =
                    haversine_distance(center_lat, center_lon, location.latitude, location.longitude);
                let distance_meters = distance_km * 1000.0;
                if distance_meters > radius_meters {
                    return None;
                }
                if let Some(vehicle_type) = filters.vehicle_type_constraint() {
                    if d.vehicle_type != vehicle_type {
                        return None;
                    }
                }
                if let Some(fuel_type) = filters.fuel_type_constraint() {
                    if d.fuel_type != fuel_type {
                        return None;
                    }
                }
                if filters.requires_pet_friendly() && !d.pet_friendly {
                    return None;
                }
                if filters.requires_extra_passengers() && d.capacity < 5 {
                    return None;
                }
                Some(NearbyDriver {
                    driver_id: d.id,
                    user_id: d.user_id,
                    driver_name: d.name.clone(),
                    latitude: location.latitude,
                    longitude: location.longitude,
                    heading: location.heading,
                    distance_meters,
                })
            })
            .collect();

        candidates.sort_by(|a, b| a.distance_meters.partial_cmp(&b.distance_meters).unwrap());
        candidates.truncate(limit);
        Ok(candidates)
    }
}

#[derive(Default)]
struct FakeRideStore {
    rides: Mutex<HashMap<RideId, Ride>>,
}

impl FakeRideStore {
    fn insert(&self, ride: Ride) {
        self.rides.lock().unwrap().insert(ride.id, ride);
    }
}

#[async_trait]
impl RideStore for FakeRideStore {
    async fn create_ride(&self, new_ride: NewRide) -> dispatch::DispatchResult<Ride> {
        let ride = Ride {
            id: Id::new(Uuid::new_v4()),
            passenger_id: new_ride.passenger_id,
            pickup: new_ride.pickup,
            dropoff: new_ride.dropoff,
            vehicle_type: new_ride.vehicle_type,
            total_fare: new_ride.total_fare,
            currency: new_ride.currency,
            passenger_note: new_ride.passenger_note,
            pickup_photo_url: new_ride.pickup_photo_url,
            status: RideStatus::Pending,
            driver_id: None,
            created_at: Utc::now(),
            accepted_at: None,
            cancelled_at: None,
            completed_at: None,
            cancellation_reason: None,
            cancelled_by: None,
        };
        self.rides.lock().unwrap().insert(ride.id, ride.clone());
        Ok(ride)
    }

    async fn get_ride(&self, ride_id: RideId) -> dispatch::DispatchResult<Option<Ride>> {
        Ok(self.rides.lock().unwrap().get(&ride_id).cloned())
    }

    async fn try_accept(
        &self,
        ride_id: RideId,
        driver_id: DriverId,
    ) -> dispatch::DispatchResult<bool> {
        let mut rides = self.rides.lock().unwrap();
        match rides.get_mut(&ride_id) {
            Some(ride) if ride.status == RideStatus::Pending && ride.driver_id.is_none() => {
                ride.status = RideStatus::Accepted;
                ride.driver_id = Some(driver_id);
                ride.accepted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_cancelled(
        &self,
        ride_id: RideId,
        cancelled_by: UserId,
        reason: Option<String>,
    ) -> dispatch::DispatchResult<bool> {
        let mut rides = self.rides.lock().unwrap();
        match rides.get_mut(&ride_id) {
            Some(ride) => {
                ride.status = RideStatus::Cancelled;
                ride.cancelled_at = Some(Utc::now());
                ride.cancelled_by = Some(cancelled_by);
                ride.cancellation_reason = reason;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Clone)]
struct PublishedEvent {
    channel: String,
    event_name: String,
    payload: serde_json::Value,
}

#[derive(Default)]
struct FakeEventPublisher {
    published: Mutex<Vec<PublishedEvent>>,
}

impl FakeEventPublisher {
    fn events_on(&self, channel: &str) -> Vec<PublishedEvent> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.channel == channel)
            .cloned()
            .collect()
    }

    fn count_on(&self, channel: &str, event_name: &str) -> usize {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.channel == channel && e.event_name == event_name)
            .count()
    }
}

#[async_trait]
impl EventPublisher for FakeEventPublisher {
    async fn publish(
        &self,
        channel: &str,
        event_name: &str,
        payload: serde_json::Value,
    ) -> dispatch::DispatchResult<()> {
        self.published.lock().unwrap().push(PublishedEvent {
            channel: channel.to_string(),
            event_name: event_name.to_string(),
            payload,
        });
        Ok(())
    }
}

fn approved_driver(name: &str, vehicle_type: &str, fuel_type: &str, capacity: i32, pet_friendly: bool) -> Driver {
    Driver {
        id: Id::new(Uuid::new_v4()),
        user_id: Uuid::new_v4(),
        name: name.to_string(),
        approval_status: ApprovalStatus::Approved,
        availability: Availability::Online,
        vehicle_type: vehicle_type.to_string(),
        fuel_type: fuel_type.to_string(),
        capacity,
        pet_friendly,
    }
}

fn pending_ride(passenger_id: UserId, lat: f64, lng: f64) -> Ride {
    Ride {
        id: Id::new(Uuid::new_v4()),
        passenger_id,
        pickup: Location {
            address: "123 Main St".to_string(),
            latitude: lat,
            longitude: lng,
        },
        dropoff: Location {
            address: "456 Side St".to_string(),
            latitude: lat + 0.1,
            longitude: lng + 0.1,
        },
        vehicle_type: "STANDARD".to_string(),
        total_fare: 12.5,
        currency: "USD".to_string(),
        passenger_note: None,
        pickup_photo_url: None,
        status: RideStatus::Pending,
        driver_id: None,
        created_at: Utc::now(),
        accepted_at: None,
        cancelled_at: None,
        completed_at: None,
        cancellation_reason: None,
        cancelled_by: None,
    }
}

/// A harness bundling the wired-together components a scenario test needs,
/// plus a `flush` helper that blocks until every message enqueued on the
/// controller so far has been processed — `Exhaust` on an id nothing is
/// dispatching is a safe no-op, so it doubles as a mailbox barrier.
struct Harness {
    driver_store: Arc<FakeDriverStore>,
    ride_store: Arc<FakeRideStore>,
    events: Arc<FakeEventPublisher>,
    driver_state: Arc<DriverStateService>,
    acceptance: Arc<AcceptanceCoordinator>,
    controller: actors::actor_ref::ActorRef<dispatch::controller::DispatchController>,
}

impl Harness {
    fn new() -> Self {
        let driver_store = Arc::new(FakeDriverStore::default());
        let ride_store = Arc::new(FakeRideStore::default());
        let events = Arc::new(FakeEventPublisher::default());

        let driver_store_dyn: Arc<dyn DriverStore> = driver_store.clone();
        let ride_store_dyn: Arc<dyn RideStore> = ride_store.clone();
        let events_dyn: Arc<dyn EventPublisher> = events.clone();

        let matching = Arc::new(MatchingService::new(driver_store_dyn.clone()));
        let driver_state = Arc::new(DriverStateService::new(driver_store_dyn.clone()));
        let controller = spawn(matching, ride_store_dyn.clone(), events_dyn.clone());
        let acceptance = Arc::new(AcceptanceCoordinator::new(
            ride_store_dyn,
            driver_state.clone(),
            events_dyn,
            controller.clone(),
        ));

        Self {
            driver_store,
            ride_store,
            events,
            driver_state,
            acceptance,
            controller,
        }
    }

    async fn flush(&self) {
        let _ = self
            .controller
            .ask(Exhaust {
                ride_id: Id::new(Uuid::new_v4()),
            })
            .await;
    }

    async fn start(&self, ride: Ride) {
        self.ride_store.insert(ride.clone());
        let _ = self
            .controller
            .ask(StartDispatch {
                ride,
                filters: MatchFilters::default(),
            })
            .await;
    }

    /// Advances the paused clock by one round interval and waits for the
    /// round timer it wakes to actually run. `time::advance` only marks the
    /// sleeping task ready; it still has to be polled and send its own
    /// `RunRound`/`Exhaust` message before our `flush` barrier is enqueued
    /// behind it; yielding repeatedly gives the executor that chance.
    async fn advance_round(&self) {
        tokio::time::advance(dispatch::config::ROUND_INTERVAL).await;
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
        self.flush().await;
    }
}

/// The lone eligible driver in round 1 accepts immediately; the ride is
/// claimed, the driver goes ON_TRIP, the rider sees exactly one
/// `ride_accepted`, and no `no_driver_found` is ever published.
#[tokio::test]
async fn single_acceptor_wins_race() {
    let harness = Harness::new();
    let d1 = approved_driver("D1", "STANDARD", "GAS", 4, false);
    let d1_id = d1.id;
    harness.driver_store.insert(d1.clone(), Some((16.801, 96.200)));

    let passenger_id = Uuid::new_v4();
    let ride = pending_ride(passenger_id, 16.80, 96.20);
    let ride_id = ride.id;
    harness.start(ride).await;

    assert_eq!(
        harness
            .events
            .count_on(&model::events::driver_private_channel(d1.user_id), "new_ride_request"),
        1
    );

    let accepted = harness.acceptance.accept(ride_id, d1_id).await.unwrap();
    assert_eq!(accepted.status, RideStatus::Accepted);
    assert_eq!(accepted.driver_id, Some(d1_id));

    let driver_after = harness
        .driver_store
        .get_driver(d1_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(driver_after.availability, Availability::OnTrip);

    let rider_channel = model::events::rider_channel(passenger_id);
    assert_eq!(harness.events.count_on(&rider_channel, "ride_accepted"), 1);
    assert_eq!(harness.events.count_on(&rider_channel, "no_driver_found"), 0);
}

/// Widening the radius across rounds only notifies a driver the first time
/// they come into range; a driver already offered the ride is never
/// re-notified in a later, wider round.
#[tokio::test(start_paused = true)]
async fn radius_expansion_notifies_each_driver_once() {
    let harness = Harness::new();

    // D3 sits just inside the round-1 (8km) radius but outside round-0
    // (5km); D4 needs the round-2 (12km) radius. Distances are approximate
    // via a simple degrees-to-metres approximation near the equator.
    let d3 = approved_driver("D3", "STANDARD", "GAS", 4, false);
    let d4 = approved_driver("D4", "STANDARD", "GAS", 4, false);
    harness.driver_store.insert(d3.clone(), Some((0.0, 0.063)));
    harness.driver_store.insert(d4.clone(), Some((0.0, 0.090)));

    let ride = pending_ride(Uuid::new_v4(), 0.0, 0.0);
    let ride_id = ride.id;
    harness.start(ride).await;

    let d3_channel = model::events::driver_private_channel(d3.user_id);
    let d4_channel = model::events::driver_private_channel(d4.user_id);

    // Round 1 (5km) should not have reached either driver yet.
    assert_eq!(harness.events.count_on(&d3_channel, "new_ride_request"), 0);
    assert_eq!(harness.events.count_on(&d4_channel, "new_ride_request"), 0);

    harness.advance_round().await;

    // Round 2 (8km) reaches D3 only.
    assert_eq!(harness.events.count_on(&d3_channel, "new_ride_request"), 1);
    assert_eq!(harness.events.count_on(&d4_channel, "new_ride_request"), 0);

    harness.advance_round().await;

    // Round 3 (12km) reaches D4 for the first time; D3 is not re-notified.
    assert_eq!(harness.events.count_on(&d3_channel, "new_ride_request"), 1);
    assert_eq!(harness.events.count_on(&d4_channel, "new_ride_request"), 1);

    let _ = ride_id;
}

/// A rider cancelling mid-offering stops further rounds and delivers
/// `ride_cancelled` to precisely the drivers already notified.
#[tokio::test(start_paused = true)]
async fn rider_cancel_during_offering_stops_rounds_and_notifies_offered_drivers() {
    let harness = Harness::new();
    let d5 = approved_driver("D5", "STANDARD", "GAS", 4, false);
    let d6 = approved_driver("D6", "STANDARD", "GAS", 4, false);
    harness.driver_store.insert(d5.clone(), Some((0.001, 0.001)));
    harness.driver_store.insert(d6.clone(), Some((0.002, 0.002)));

    let passenger_id = Uuid::new_v4();
    let ride = pending_ride(passenger_id, 0.0, 0.0);
    let ride_id = ride.id;
    harness.start(ride).await;

    let d5_channel = model::events::driver_private_channel(d5.user_id);
    let d6_channel = model::events::driver_private_channel(d6.user_id);
    assert_eq!(harness.events.count_on(&d5_channel, "new_ride_request"), 1);
    assert_eq!(harness.events.count_on(&d6_channel, "new_ride_request"), 1);

    let cancelled = harness
        .acceptance
        .cancel(ride_id, CancelledBy::Passenger(passenger_id), None)
        .await
        .unwrap();
    assert_eq!(cancelled.status, RideStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("USER_CANCELLED"));

    assert_eq!(harness.events.count_on(&d5_channel, "ride_cancelled"), 1);
    assert_eq!(harness.events.count_on(&d6_channel, "ride_cancelled"), 1);

    // Advancing past every remaining round must not publish anything
    // further: the dispatch was torn down by the cancel.
    let before = harness.events.events_on(&d5_channel).len();
    for _ in 0..dispatch::config::round_count() {
        harness.advance_round().await;
    }
    assert_eq!(harness.events.events_on(&d5_channel).len(), before);
}

/// With zero eligible drivers across every round, the ride is cancelled
/// with `NO_DRIVERS_AVAILABLE` and `no_driver_found` is published exactly
/// once to the rider.
#[tokio::test(start_paused = true)]
async fn exhaustion_with_no_drivers_cancels_and_notifies_rider_once() {
    let harness = Harness::new();
    let passenger_id = Uuid::new_v4();
    let ride = pending_ride(passenger_id, 10.0, 10.0);
    let ride_id = ride.id;
    harness.start(ride).await;

    for _ in 0..dispatch::config::round_count() {
        harness.advance_round().await;
    }
    // The grace interval after the final round.
    harness.advance_round().await;

    let ride = harness.ride_store.get_ride(ride_id).await.unwrap().unwrap();
    assert_eq!(ride.status, RideStatus::Cancelled);
    assert_eq!(
        ride.cancellation_reason.as_deref(),
        Some("NO_DRIVERS_AVAILABLE")
    );

    let rider_channel = model::events::rider_channel(passenger_id);
    assert_eq!(harness.events.count_on(&rider_channel, "no_driver_found"), 1);
}

/// Two drivers racing to accept the same ride: exactly one conditional
/// update wins, the loser sees `Conflict`, and no side effect runs for the
/// loser.
#[tokio::test]
async fn acceptance_race_has_exactly_one_winner() {
    let harness = Harness::new();
    let d7 = approved_driver("D7", "STANDARD", "GAS", 4, false);
    let d8 = approved_driver("D8", "STANDARD", "GAS", 4, false);
    let d7_id = d7.id;
    let d8_id = d8.id;
    harness.driver_store.insert(d7.clone(), Some((0.001, 0.001)));
    harness.driver_store.insert(d8.clone(), Some((0.002, 0.002)));

    let ride = pending_ride(Uuid::new_v4(), 0.0, 0.0);
    let ride_id = ride.id;
    harness.start(ride).await;

    let first = harness.acceptance.accept(ride_id, d7_id).await;
    let second = harness.acceptance.accept(ride_id, d8_id).await;

    assert!(first.is_ok());
    assert!(matches!(second, Err(dispatch::DispatchError::Conflict(_))));

    let loser = harness.driver_store.get_driver(d8_id).await.unwrap().unwrap();
    assert_eq!(
        loser.availability,
        Availability::Online,
        "the losing driver's availability must be untouched"
    );

    let rider = harness.ride_store.get_ride(ride_id).await.unwrap().unwrap();
    assert_eq!(rider.driver_id, Some(d7_id));
}

/// `setAvailabilityFromPresence` never raises and never promotes a
/// non-approved driver to ONLINE.
#[tokio::test]
async fn presence_never_fails_and_skips_unapproved_drivers() {
    let harness = Harness::new();

    // Unknown clientId: must not error.
    harness
        .driver_state
        .set_availability_from_presence(Uuid::new_v4(), true)
        .await
        .unwrap();

    let mut pending_approval = approved_driver("D9", "STANDARD", "GAS", 4, false);
    pending_approval.approval_status = ApprovalStatus::Pending;
    pending_approval.availability = Availability::Offline;
    let pending_user_id = pending_approval.user_id;
    harness.driver_store.insert(pending_approval, None);

    harness
        .driver_state
        .set_availability_from_presence(pending_user_id, true)
        .await
        .unwrap();

    let driver = harness
        .driver_store
        .find_driver_by_user_id(pending_user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(driver.availability, Availability::Offline);
}

/// `enter` then `leave` leaves a driver OFFLINE; `enter` then `enter` again
/// leaves them ONLINE (idempotent, not toggling).
#[tokio::test]
async fn presence_enter_leave_round_trip() {
    let harness = Harness::new();
    let mut driver = approved_driver("D10", "STANDARD", "GAS", 4, false);
    driver.availability = Availability::Offline;
    let user_id = driver.user_id;
    harness.driver_store.insert(driver, None);

    harness
        .driver_state
        .set_availability_from_presence(user_id, true)
        .await
        .unwrap();
    harness
        .driver_state
        .set_availability_from_presence(user_id, true)
        .await
        .unwrap();
    let after_double_enter = harness
        .driver_store
        .find_driver_by_user_id(user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_double_enter.availability, Availability::Online);

    harness
        .driver_state
        .set_availability_from_presence(user_id, false)
        .await
        .unwrap();
    let after_leave = harness
        .driver_store
        .find_driver_by_user_id(user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_leave.availability, Availability::Offline);
}

/// Matching conjunctively applies every filter: only the driver satisfying
/// all of them is returned.
#[tokio::test]
async fn matching_applies_filters_conjunctively() {
    let harness = Harness::new();
    let d9 = approved_driver("D9", "STANDARD", "GAS", 4, false);
    let d10 = approved_driver("D10", "PLUS", "GAS", 4, false);
    let d11 = approved_driver("D11", "PLUS", "GAS", 6, false);
    harness.driver_store.insert(d9, Some((0.01, 0.01)));
    harness.driver_store.insert(d10, Some((0.01, 0.01)));
    let d11_id = d11.id;
    harness.driver_store.insert(d11, Some((0.01, 0.01)));

    let driver_store: Arc<dyn DriverStore> = harness.driver_store.clone();
    let matching = MatchingService::new(driver_store);
    let filters = MatchFilters {
        vehicle_type: Some("PLUS".to_string()),
        fuel_type: None,
        pet_friendly: None,
        extra_passengers: Some(true),
    };
    let results = matching.find_nearby(0.0, 0.0, 10_000.0, 25, &filters).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].driver_id, d11_id);
}
