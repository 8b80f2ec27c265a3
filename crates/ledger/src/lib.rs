//! Dedup ledger: an idempotent set of identities already processed.
//!
//! The greeter uses this to guarantee at most one greeting per identity.
//! Backends: in-memory, append-only file, and sqlite. All satisfy the same
//! contract: once `add` returns, `contains` for that identity is true for
//! the remainder of the process lifetime, including under concurrent
//! callers. Entries never need removal for correctness — presence is
//! monotonic.

pub mod error;
pub mod file;
pub mod mem;
pub mod sqlite;

use async_trait::async_trait;

pub use {error::LedgerError, file::FileLedger, mem::MemLedger, sqlite::SqliteLedger};

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Record an identity. Idempotent: adding an identity twice is not an
    /// error and leaves the ledger unchanged.
    async fn add(&self, identity: &str) -> Result<(), LedgerError>;

    /// Whether the identity has been recorded.
    async fn contains(&self, identity: &str) -> Result<bool, LedgerError>;
}
