use std::str::FromStr;

use {
    async_trait::async_trait,
    sqlx::{
        SqlitePool,
        sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    },
    tracing::info,
};

use crate::{Ledger, error::LedgerError};

/// Sqlite-backed ledger for durable dedup state shared across restarts.
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Connect to a sqlite database URL (e.g. `sqlite:herald.db` or
    /// `sqlite::memory:`), creating the file and schema if missing.
    pub async fn connect(url: &str) -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| LedgerError::Backend(e.to_string()))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query("CREATE TABLE IF NOT EXISTS ledger (identity TEXT PRIMARY KEY)")
            .execute(&pool)
            .await?;
        info!(url, "sqlite ledger ready");

        Ok(Self { pool })
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn add(&self, identity: &str) -> Result<(), LedgerError> {
        sqlx::query("INSERT OR IGNORE INTO ledger (identity) VALUES (?1)")
            .bind(identity)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn contains(&self, identity: &str) -> Result<bool, LedgerError> {
        let present: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM ledger WHERE identity = ?1)")
                .bind(identity)
                .fetch_one(&self.pool)
                .await?;
        Ok(present)
    }
}
