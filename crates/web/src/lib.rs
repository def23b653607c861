use std::sync::Arc;

use actors::actor_ref::ActorRef;
use axum::Router;
use dispatch::controller::DispatchController;
use dispatch::ports::RideStore;
use dispatch::{AcceptanceCoordinator, DriverStateService, MatchingService, PresenceSink};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod common;

/// Everything an HTTP handler needs, shared behind a single `Arc` rather
/// than a per-field `FromRef` derive — this crate's state has no
/// sub-router that only needs a slice of it, so one `State<Arc<WebState>>`
/// extractor on every handler is simpler than deriving `FromRef` for each
/// field.
pub struct WebState {
    pub ride_store: Arc<dyn RideStore>,
    pub driver_state: Arc<DriverStateService>,
    pub matching: Arc<MatchingService>,
    pub acceptance: Arc<AcceptanceCoordinator>,
    pub presence: Arc<PresenceSink>,
    pub controller: ActorRef<DispatchController>,
    /// `keyName:keySecret`, `None` when `ABLY_API_KEY` was not configured
    /// at startup. The presence webhook rejects every request in that
    /// case, since there is no key to verify a signature against.
    pub ably_api_key: Option<String>,
}

pub async fn start_web_server(state: Arc<WebState>) -> std::io::Result<()> {
    let routes = api::routes(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    axum::serve(listener, routes.into_make_service()).await?;

    Ok(())
}
