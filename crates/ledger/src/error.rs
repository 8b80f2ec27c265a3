use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("ledger backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        Self::Backend(e.to_string())
    }
}
