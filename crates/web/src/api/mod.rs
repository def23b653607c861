use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use crate::WebState;

pub mod dispatch;
pub mod rides;
pub mod webhooks;

pub fn routes(state: Arc<WebState>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .merge(dispatch::routes())
        .merge(rides::routes())
        .merge(webhooks::routes())
        .with_state(state)
}

async fn ping() -> impl IntoResponse {
    Json(json!({ "message": "pong!" }))
}
