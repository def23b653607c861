use actors::handler::Message;
use model::filters::MatchFilters;
use model::Ride;

/// Begins dispatching `ride`, running round 1 immediately and scheduling
/// round 2 for one `ROUND_INTERVAL` later.
#[derive(Debug, Clone)]
pub struct StartDispatch {
    pub ride: Ride,
    pub filters: MatchFilters,
}

impl Message for StartDispatch {
    type Response = ();
}

/// Fired by the controller's own timer. Carries the round number it's about
/// to run so a timer for a ride that has since been accepted or cancelled
/// (and is therefore no longer in the controller's table) is a harmless
/// no-op rather than acting on stale state.
#[derive(Debug, Clone)]
pub struct RunRound {
    pub ride_id: model::RideId,
    pub round: usize,
}

impl Message for RunRound {
    type Response = ();
}

/// Fired one `ROUND_INTERVAL` after the final round. Declares the ride
/// exhausted if it's still pending.
#[derive(Debug, Clone)]
pub struct Exhaust {
    pub ride_id: model::RideId,
}

impl Message for Exhaust {
    type Response = ();
}

/// Stops dispatching a ride, whether because it was accepted, the rider
/// cancelled, or a driver cancelled after acceptance. Removing the ride from
/// the controller's table is what makes any timer still in flight for it a
/// no-op.
#[derive(Debug, Clone)]
pub struct StopDispatch {
    pub ride_id: model::RideId,
}

impl Message for StopDispatch {
    type Response = ();
}
