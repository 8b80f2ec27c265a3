//! The plugin orchestrator.
//!
//! [`Bot`] owns connector lifecycle, merges every inbound connector's event
//! stream into one dispatch stream, and delivers each event to the
//! registered behavior modules in registration order. The merge point is a
//! single-consumer serialization point: connectors produce concurrently,
//! but no two module invocations ever run at the same time, so modules
//! need no locking around shared capabilities like the ledger.

pub mod bot;
pub mod error;
pub mod module;

pub use {
    bot::Bot,
    error::BotError,
    module::{Module, ReadLogger},
};
