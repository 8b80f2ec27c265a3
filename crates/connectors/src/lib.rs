//! Connector plugin system.
//!
//! Each realtime source (IRC chat, platform PubSub) implements the
//! [`InboundConnector`] trait; sources that can also talk back implement
//! [`ChatSender`]. The orchestrator in `herald-bot` owns connector
//! lifecycle and merges their event streams into one dispatch stream.

pub mod error;
pub mod event;
pub mod plugin;

pub use {
    error::ConnectorError,
    event::Event,
    plugin::{ChatSender, ConnectorState, InboundConnector},
};
