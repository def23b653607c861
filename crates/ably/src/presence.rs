use dispatch::PresenceTransition;
use serde::Deserialize;

/// Ably's `enter` action code.
const ACTION_ENTER: i32 = 2;
/// Ably's `leave` action code.
const ACTION_LEAVE: i32 = 3;

const SOURCE_CHANNEL_PRESENCE: &str = "channel.presence";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceWebhookBody {
    pub items: Vec<PresenceItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceItem {
    pub source: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub data: Option<PresenceItemData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceItemData {
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub presence: Vec<PresenceMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceMessage {
    #[serde(default)]
    pub client_id: Option<String>,
    pub action: i32,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Flattens a webhook batch into the availability transitions the Presence
/// Sink applies, preserving the order presence messages appear in. Items
/// with `source != "channel.presence"`, messages with no (or unparsable)
/// `clientId`, and actions other than `enter`/`leave` are dropped silently.
pub fn extract_transitions(body: &PresenceWebhookBody) -> Vec<PresenceTransition> {
    body.items
        .iter()
        .filter(|item| item.source == SOURCE_CHANNEL_PRESENCE)
        .filter_map(|item| item.data.as_ref())
        .flat_map(|data| data.presence.iter())
        .filter_map(|message| {
            let online = match message.action {
                ACTION_ENTER => true,
                ACTION_LEAVE => false,
                _ => return None,
            };
            let client_id = message.client_id.as_deref()?;
            if client_id.is_empty() {
                return None;
            }
            let user_id = uuid::Uuid::parse_str(client_id).ok()?;
            Some(PresenceTransition { user_id, online })
        })
        .collect()
}
