mod controller;
mod messages;
mod state;

pub use controller::{spawn, DispatchController};
pub use messages::{Exhaust, RunRound, StartDispatch, StopDispatch};
pub use state::{ActiveDispatch, NotifiedDriver};
