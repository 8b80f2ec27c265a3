use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration, keyed by channel name (without the `#` prefix).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    pub channels: HashMap<String, ChannelConfig>,
}

/// Per-channel settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Platform-assigned numeric channel id, used for the pub/sub topic
    /// subscription.
    pub channel_id: String,
    /// Greeter tunables. Absent means the greeter cannot be enabled for
    /// this channel.
    pub greeter: Option<GreeterConfig>,
}

/// Greeter settings for one channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GreeterConfig {
    /// Greeting template; `{user}` is replaced with the joining identity.
    pub message_format: String,
}

impl HeraldConfig {
    /// Look up a channel's config. Accepts the name with or without the
    /// leading `#`.
    pub fn channel(&self, name: &str) -> Option<&ChannelConfig> {
        self.channels.get(name.trim_start_matches('#'))
    }
}
