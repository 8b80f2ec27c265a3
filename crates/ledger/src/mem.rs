use std::{
    collections::HashSet,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use crate::{Ledger, error::LedgerError};

/// Process-local ledger. Contents are lost on restart, so identities may
/// be re-greeted across runs — acceptable for development and testing.
#[derive(Debug, Clone, Default)]
pub struct MemLedger {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl MemLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for MemLedger {
    async fn add(&self, identity: &str) -> Result<(), LedgerError> {
        let mut set = self
            .inner
            .write()
            .map_err(|e| LedgerError::Backend(e.to_string()))?;
        set.insert(identity.to_string());
        Ok(())
    }

    async fn contains(&self, identity: &str) -> Result<bool, LedgerError> {
        let set = self
            .inner
            .read()
            .map_err(|e| LedgerError::Backend(e.to_string()))?;
        Ok(set.contains(identity))
    }
}
