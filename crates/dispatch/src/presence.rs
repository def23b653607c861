use std::sync::Arc;

use model::UserId;

use crate::driver_state::DriverStateService;

/// A single member-presence transition, already authenticated and parsed out
/// of the wire payload by the caller (the `ably` crate verifies the webhook
/// signature and maps Ably's `enter`/`leave` actions onto `online` before
/// this type is constructed; `absent`, `update` and anything else never
/// reach this type at all).
#[derive(Debug, Clone, Copy)]
pub struct PresenceTransition {
    /// The broker's `clientId`, which is the driver's owning user id, not a
    /// `DriverId`. The broker has no notion of our internal driver rows.
    pub user_id: UserId,
    pub online: bool,
}

/// Applies presence transitions to driver availability. Kept separate from
/// [`DriverStateService`] so the webhook ingress path can be unit tested
/// without a broker: it depends only on `DriverStore` through the service,
/// not on any Ably type.
pub struct PresenceSink {
    driver_state: Arc<DriverStateService>,
}

impl PresenceSink {
    pub fn new(driver_state: Arc<DriverStateService>) -> Self {
        Self { driver_state }
    }

    /// Never fails: a `clientId` with no matching driver, or a driver the
    /// presence path doesn't own (not approved, or mid-trip), is logged and
    /// skipped rather than surfaced as an error, per the presence sink's
    /// "must not throw" contract.
    pub async fn handle(&self, transition: PresenceTransition) {
        if let Err(error) = self
            .driver_state
            .set_availability_from_presence(transition.user_id, transition.online)
            .await
        {
            tracing::warn!(
                user_id = %transition.user_id,
                online = transition.online,
                %error,
                "presence transition failed, skipping"
            );
        }
    }
}
