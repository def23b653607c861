use async_trait::async_trait;
use dispatch::error::{DispatchError, DispatchResult};
use dispatch::ports::EventPublisher;

/// Publishes dispatch events to Ably's REST API. One HTTP call per publish;
/// Ably queues delivery to whichever clients are subscribed to `channel`, so
/// this is fire-and-forget from the dispatch core's perspective once the
/// REST call itself succeeds.
pub struct AblyEventPublisher {
    client: reqwest::Client,
    rest_base_url: String,
    api_key: String,
}

impl AblyEventPublisher {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://rest.ably.io".to_string())
    }

    pub fn with_base_url(api_key: String, rest_base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            rest_base_url,
            api_key,
        }
    }
}

#[async_trait]
impl EventPublisher for AblyEventPublisher {
    async fn publish(
        &self,
        channel: &str,
        event_name: &str,
        payload: serde_json::Value,
    ) -> DispatchResult<()> {
        let url = format!(
            "{}/channels/{}/messages",
            self.rest_base_url,
            urlencoding_channel(channel)
        );

        let body = serde_json::json!({
            "name": event_name,
            "data": payload,
        });

        let (key_name, key_secret) = self
            .api_key
            .split_once(':')
            .ok_or_else(|| DispatchError::internal(InvalidApiKeyError))?;

        let response = self
            .client
            .post(&url)
            .basic_auth(key_name, Some(key_secret))
            .json(&body)
            .send()
            .await
            .map_err(DispatchError::internal)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%channel, %event_name, %status, %body, "ably publish rejected");
            return Err(DispatchError::internal(crate::error::PublishError::Rejected {
                status,
                body,
            }));
        }

        Ok(())
    }
}

/// Ably channel names may contain `:` (used throughout this crate's own
/// channel-naming convention), which is a safe path segment once percent
/// encoded.
fn urlencoding_channel(channel: &str) -> String {
    channel
        .bytes()
        .map(|byte| match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (byte as char).to_string()
            }
            other => format!("%{:02X}", other),
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
#[error("ABLY_API_KEY is not in the expected `keyName:keySecret` form")]
struct InvalidApiKeyError;

/// A publisher that logs instead of calling out to a broker. Used in tests
/// and as the degraded-mode fallback when no broker credential is
/// configured at startup, so the server can still accept and dispatch rides
/// with publishes merely logged rather than delivered — permissible since
/// publish failures must never abort a dispatch round anyway.
pub struct LoggingEventPublisher;

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(
        &self,
        channel: &str,
        event_name: &str,
        payload: serde_json::Value,
    ) -> DispatchResult<()> {
        tracing::info!(%channel, %event_name, %payload, "publish (no broker configured)");
        Ok(())
    }
}
