use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::common::RouteErrorResponse;
use crate::WebState;

pub fn routes() -> Router<Arc<WebState>> {
    Router::new().route("/webhooks/ably/presence", post(presence_webhook))
}

/// Verifies the request against the exact raw bytes of the body before
/// anything touches JSON — the signature is over the wire bytes, not over
/// a re-serialization of them. A signature failure aborts the whole
/// request with 403; a malformed individual presence message inside an
/// otherwise-valid, correctly-signed body is swallowed per-item instead
/// (`ably::extract_transitions` already drops anything it can't parse).
async fn presence_webhook(
    State(state): State<Arc<WebState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, RouteErrorResponse> {
    let Some(api_key) = state.ably_api_key.as_deref() else {
        tracing::warn!("presence webhook received but ABLY_API_KEY is not configured, rejecting");
        return Err(RouteErrorResponse::new(
            StatusCode::FORBIDDEN,
            "signature verification failed",
        ));
    };
    let api_key = ably::ApiKey::parse(api_key).ok_or_else(|| {
        tracing::error!("ABLY_API_KEY is configured but malformed, rejecting presence webhook");
        RouteErrorResponse::new(StatusCode::FORBIDDEN, "signature verification failed")
    })?;

    let key_name = headers.get("x-ably-key").and_then(|value| value.to_str().ok());
    let signature = headers
        .get("x-ably-signature")
        .and_then(|value| value.to_str().ok());

    ably::verify(&api_key, key_name, signature, &body)
        .map_err(|_| RouteErrorResponse::new(StatusCode::FORBIDDEN, "signature verification failed"))?;

    let parsed: ably::PresenceWebhookBody = serde_json::from_slice(&body)
        .map_err(|_| RouteErrorResponse::new(StatusCode::BAD_REQUEST, "malformed webhook body"))?;

    let transitions = ably::extract_transitions(&parsed);
    let processed = transitions.len();
    for transition in transitions {
        state.presence.handle(transition).await;
    }

    Ok(Json(json!({ "ok": true, "processed": processed })))
}
