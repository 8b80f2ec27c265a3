use chrono::{DateTime, Utc};

/// An inbound event produced by a connector.
///
/// Events are immutable once produced. Each carries the source timestamp
/// and, where the variant has one, the identity of the originating chat
/// participant. Identities are opaque strings compared exactly — no
/// normalization happens here; connectors pre-normalize before emitting.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// A chat line posted to the channel.
    ChatMessage {
        at: DateTime<Utc>,
        channel: String,
        sender: String,
        text: String,
    },
    /// A participant joined (or otherwise became visible in) the channel.
    Presence {
        at: DateTime<Utc>,
        channel: String,
        identity: String,
    },
    /// A platform pub/sub notification (e.g. channel points redemption).
    PubSubNotification {
        at: DateTime<Utc>,
        topic: String,
        payload: serde_json::Value,
    },
}

impl Event {
    /// The identity attached to this event, if the variant carries one.
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::ChatMessage { sender, .. } => Some(sender),
            Self::Presence { identity, .. } => Some(identity),
            Self::PubSubNotification { .. } => None,
        }
    }
}
