//! IRC-over-WebSocket chat connector.
//!
//! The inbound side turns PRIVMSG lines into chat-message events and JOIN
//! lines into presence events; the outbound side ([`IrcSender`]) posts
//! PRIVMSG replies and is safe to use concurrently with the receive loop.

pub mod config;
pub mod connector;
pub mod parse;

pub use {
    config::{IrcConfig, TWITCH_CHAT_URL},
    connector::{IrcConnector, IrcSender},
};
