//! Process configuration: per-channel settings consumed at setup time.
//!
//! The core receives already-resolved values from here; a missing or
//! unparseable file is a setup error surfaced before dispatch begins.

pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{discover_and_load, load_config},
    schema::{ChannelConfig, GreeterConfig, HeraldConfig},
};
