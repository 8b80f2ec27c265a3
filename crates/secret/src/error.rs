use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("credential not found: {0}")]
    NotFound(String),

    #[error("secret backend unavailable: {0}")]
    Unavailable(String),
}
