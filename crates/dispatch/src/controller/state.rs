use model::filters::MatchFilters;
use model::{DriverId, Ride, UserId};

/// A driver who has already been offered the ride, recorded with both ids:
/// `DriverId` so later rounds can exclude them from the matching query, and
/// `UserId` so cancellation can address their private event channel, which
/// is named by user id rather than driver id.
#[derive(Debug, Clone, Copy)]
pub struct NotifiedDriver {
    pub driver_id: DriverId,
    pub user_id: UserId,
}

/// In-memory state for one ride currently being dispatched. Lives only in
/// the controller actor's mailbox-serialized map; it is not persisted. A
/// crash loses in-flight dispatch state and leaves the ride `PENDING` for
/// manual or future-work recovery, which this crate accepts rather than
/// works around.
pub struct ActiveDispatch {
    pub ride: Ride,
    pub filters: MatchFilters,
    /// 1-indexed round most recently run.
    pub round: usize,
    /// Every driver offered this ride so far, across all rounds. The
    /// notified set: a `DriverId` never appears here twice.
    pub offered: Vec<NotifiedDriver>,
}

impl ActiveDispatch {
    pub fn new(ride: Ride, filters: MatchFilters) -> Self {
        Self {
            ride,
            filters,
            round: 0,
            offered: Vec::new(),
        }
    }

    pub fn offered_driver_ids(&self) -> Vec<DriverId> {
        self.offered.iter().map(|d| d.driver_id).collect()
    }
}
