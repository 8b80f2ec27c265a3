use {async_trait::async_trait, secrecy::Secret, serde::Deserialize, tracing::debug};

use crate::{SecretStore, error::SecretError};

/// Default KV v2 path under which the chat token lives.
pub const DEFAULT_SECRET_PATH: &str = "herald/chat";

/// Field name inside the secret holding the token value.
const TOKEN_FIELD: &str = "token";

/// Reads the chat token from a HashiCorp-Vault-style KV v2 HTTP API.
pub struct VaultSecretStore {
    client: reqwest::Client,
    addr: String,
    token: Secret<String>,
    path: String,
}

/// KV v2 read response: `{ "data": { "data": { "token": "..." } } }`.
#[derive(Deserialize)]
struct KvResponse {
    data: KvData,
}

#[derive(Deserialize)]
struct KvData {
    data: std::collections::HashMap<String, String>,
}

impl VaultSecretStore {
    pub fn new(addr: impl Into<String>, token: Secret<String>, path: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            addr: addr.into(),
            token,
            path: path.into(),
        }
    }

    /// Build from `VAULT_ADDR` / `VAULT_TOKEN`, with the default path.
    pub fn from_env() -> Result<Self, SecretError> {
        let addr = std::env::var("VAULT_ADDR")
            .map_err(|_| SecretError::Unavailable("VAULT_ADDR not set".into()))?;
        let token = std::env::var("VAULT_TOKEN")
            .map_err(|_| SecretError::Unavailable("VAULT_TOKEN not set".into()))?;
        Ok(Self::new(addr, Secret::new(token), DEFAULT_SECRET_PATH))
    }
}

#[async_trait]
impl SecretStore for VaultSecretStore {
    async fn chat_token(&self) -> Result<Secret<String>, SecretError> {
        use secrecy::ExposeSecret;

        let url = format!(
            "{}/v1/secret/data/{}",
            self.addr.trim_end_matches('/'),
            self.path
        );
        debug!(%url, "reading chat token from vault");

        let response = self
            .client
            .get(&url)
            .header("X-Vault-Token", self.token.expose_secret())
            .send()
            .await
            .map_err(|e| SecretError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SecretError::NotFound(self.path.clone()));
        }
        let response = response
            .error_for_status()
            .map_err(|e| SecretError::Unavailable(e.to_string()))?;

        let body: KvResponse = response
            .json()
            .await
            .map_err(|e| SecretError::Unavailable(e.to_string()))?;

        body.data
            .data
            .get(TOKEN_FIELD)
            .map(|value| Secret::new(value.clone()))
            .ok_or_else(|| SecretError::NotFound(format!("{}#{TOKEN_FIELD}", self.path)))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_response_parses_token_field() {
        let raw = r#"{"data":{"data":{"token":"oauth-abc123"}}}"#;
        let parsed: KvResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data.data.get("token").map(String::as_str), Some("oauth-abc123"));
    }
}
