use {async_trait::async_trait, secrecy::Secret};

use crate::{SecretStore, error::SecretError};

/// Default environment variable holding the chat token.
pub const DEFAULT_TOKEN_VAR: &str = "HERALD_CHAT_TOKEN";

/// Reads the chat token from a process environment variable.
pub struct EnvSecretStore {
    var: String,
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self::with_var(DEFAULT_TOKEN_VAR)
    }

    pub fn with_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn chat_token(&self) -> Result<Secret<String>, SecretError> {
        match std::env::var(&self.var) {
            Ok(value) if !value.is_empty() => Ok(Secret::new(value)),
            _ => Err(SecretError::NotFound(self.var.clone())),
        }
    }
}
