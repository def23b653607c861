use std::sync::Arc;

use ably::{AblyConfig, AblyEventPublisher, LoggingEventPublisher};
use database::{DatabaseConnectionInfo, PgDatabase};
use dispatch::ports::{DriverStore, EventPublisher, RideStore};
use dispatch::{AcceptanceCoordinator, DriverStateService, MatchingService, PresenceSink};
use web::{start_web_server, WebState};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let database_connection_info = DatabaseConnectionInfo::from_env().unwrap_or_else(|| {
        tracing::error!("DATABASE_URL is not set");
        std::process::exit(1);
    });

    let database = PgDatabase::connect(database_connection_info)
        .await
        .unwrap_or_else(|error| {
            tracing::error!(%error, "could not connect to database or run migrations");
            std::process::exit(1);
        });
    let database = Arc::new(database);

    let driver_store: Arc<dyn DriverStore> = database.clone();
    let ride_store: Arc<dyn RideStore> = database.clone();

    let driver_state = Arc::new(DriverStateService::new(driver_store.clone()));
    let matching = Arc::new(MatchingService::new(driver_store.clone()));

    let (events, ably_api_key): (Arc<dyn EventPublisher>, Option<String>) =
        match AblyConfig::from_env() {
            Ok(config) => {
                let publisher = AblyEventPublisher::with_base_url(
                    config.api_key.clone(),
                    config.rest_base_url.clone(),
                );
                (Arc::new(publisher), Some(config.api_key))
            }
            Err(error) => {
                tracing::warn!(%error, "starting without a broker credential; publishes will only be logged");
                (Arc::new(LoggingEventPublisher), None)
            }
        };

    let controller = dispatch::controller::spawn(matching.clone(), ride_store.clone(), events.clone());

    let acceptance = Arc::new(AcceptanceCoordinator::new(
        ride_store.clone(),
        driver_state.clone(),
        events.clone(),
        controller.clone(),
    ));

    let presence = Arc::new(PresenceSink::new(driver_state.clone()));

    let state = Arc::new(WebState {
        ride_store,
        driver_state,
        matching,
        acceptance,
        presence,
        controller,
        ably_api_key,
    });

    if let Err(error) = start_web_server(state).await {
        tracing::error!(%error, "web server exited with an error");
        std::process::exit(1);
    }
}
