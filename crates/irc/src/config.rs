use secrecy::Secret;

/// Twitch chat WebSocket endpoint.
pub const TWITCH_CHAT_URL: &str = "wss://irc-ws.chat.twitch.tv:443";

/// Connection settings for the chat connector.
#[derive(Clone)]
pub struct IrcConfig {
    /// WebSocket URL of the IRC gateway.
    pub url: String,
    /// Nickname to authenticate as.
    pub nick: String,
    /// Channel to join, including the `#` prefix.
    pub channel: String,
    /// OAuth token (sent as `PASS oauth:<token>`).
    pub token: Secret<String>,
}
