//! Credential resolution for connectors.
//!
//! Resolving the chat token is a synchronous precondition to connector
//! construction: no connector starts without one, and a backend failure
//! here is fatal at setup time. Backends: process environment and a
//! vault-style HTTP KV store.

pub mod env;
pub mod error;
pub mod vault;

use {async_trait::async_trait, secrecy::Secret};

pub use {env::EnvSecretStore, error::SecretError, vault::VaultSecretStore};

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Resolve the chat authentication token.
    async fn chat_token(&self) -> Result<Secret<String>, SecretError>;
}
