//! Platform PubSub connector.
//!
//! Subscribes to the channel-points topic over a WebSocket and emits the
//! payload of every MESSAGE frame as a pub/sub notification event. The
//! protocol requires a client PING at least every five minutes; the
//! connector sends one every four. A server RECONNECT terminates the
//! stream — reconnecting is deliberately not this connector's job.

pub mod connector;
pub mod frame;

pub use {
    connector::{PubSubConfig, PubSubConnector, TWITCH_PUBSUB_URL},
    frame::CHANNEL_POINTS_TOPIC,
};
