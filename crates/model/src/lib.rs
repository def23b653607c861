pub mod driver;
pub mod events;
pub mod filters;
pub mod ride;

pub use driver::{ApprovalStatus, Availability, Driver, DriverLocation};
pub use ride::{Location, Ride, RideStatus};

use utility::id::HasId;
use uuid::Uuid;

/// The user/role model itself lives outside the dispatch core; only the
/// bare identifier is needed here, so it is a plain `Uuid` rather than an
/// `Id<User>` wrapper around a type this crate doesn't define.
pub type UserId = Uuid;

impl HasId for Driver {
    type IdType = Uuid;
}

impl HasId for Ride {
    type IdType = Uuid;
}

pub type DriverId = utility::id::Id<Driver>;
pub type RideId = utility::id::Id<Ride>;
