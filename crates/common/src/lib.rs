//! Shared error plumbing used across all herald crates.

pub mod error;

pub use error::{Error, FromMessage, HeraldError, Result};
