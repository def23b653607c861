use std::sync::Arc;

use model::filters::{MatchFilters, NearbyDriver};
use model::DriverId;

use crate::error::{DispatchError, DispatchResult};
use crate::ports::DriverStore;

/// Thin wrapper over [`DriverStore::find_nearby`] exposed both to the
/// dispatch-facing `GET /dispatch/nearby` endpoint and to the
/// Dispatch Controller's per-round widening search. The filter
/// and capacity semantics themselves live in the store implementation's
/// query, since they're expressed most naturally as part of the same SQL
/// that does the bounding-box prefilter.
pub struct MatchingService {
    store: Arc<dyn DriverStore>,
}

impl MatchingService {
    pub fn new(store: Arc<dyn DriverStore>) -> Self {
        Self { store }
    }

    pub async fn find_nearby(
        &self,
        center_lat: f64,
        center_lon: f64,
        radius_meters: f64,
        limit: usize,
        filters: &MatchFilters,
    ) -> DispatchResult<Vec<NearbyDriver>> {
        if !center_lat.is_finite() || !center_lon.is_finite() {
            return Err(DispatchError::BadRequest(
                "latitude and longitude must be finite".into(),
            ));
        }

        self.store
            .find_nearby(center_lat, center_lon, radius_meters, limit, filters, &[])
            .await
    }

    /// Round-scoped search used by the controller: `offered` excludes every
    /// driver already sent this ride in an earlier round so a widened radius
    /// only ever surfaces new candidates. The pickup coordinates are already
    /// validated by `NewRide` ingestion, so this skips the finiteness check.
    pub async fn find_nearby_excluding(
        &self,
        center_lat: f64,
        center_lon: f64,
        radius_meters: f64,
        limit: usize,
        filters: &MatchFilters,
        offered: &[DriverId],
    ) -> DispatchResult<Vec<NearbyDriver>> {
        self.store
            .find_nearby(center_lat, center_lon, radius_meters, limit, filters, offered)
            .await
    }
}
