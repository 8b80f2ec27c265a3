use serde::{Deserialize, Serialize};

/// Topic prefix for channel point redemptions.
pub const CHANNEL_POINTS_TOPIC: &str = "channel-points-channel-v1";

/// Client-to-server frames.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Outgoing {
    Listen { nonce: String, data: ListenData },
    Ping,
}

#[derive(Debug, Serialize)]
pub struct ListenData {
    pub topics: Vec<String>,
    pub auth_token: String,
}

/// Server-to-client frame, decoded loosely: the `type` discriminant plus
/// whichever optional fields the frame kind carries.
#[derive(Debug, Deserialize)]
pub struct Incoming {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub data: Option<IncomingData>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingData {
    pub topic: String,
    /// The payload, itself a JSON document encoded as a string.
    pub message: String,
}
