use std::{
    collections::HashSet,
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::Path,
    sync::Mutex,
};

use {async_trait::async_trait, tracing::debug};

use crate::{Ledger, error::LedgerError};

/// Newline-delimited append-only file ledger.
///
/// The whole file is hydrated into memory at open; `add` appends a line
/// before updating the in-memory set, so an entry that survived a crash is
/// never re-greeted on the next run. Writes happen under one mutex — the
/// orchestrator serializes module calls anyway, the lock only guards
/// against concurrent use outside dispatch.
pub struct FileLedger {
    inner: Mutex<Inner>,
}

struct Inner {
    entries: HashSet<String>,
    file: File,
}

impl FileLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let mut entries = HashSet::new();
        for line in BufReader::new(&file).lines() {
            let line = line?;
            if !line.is_empty() {
                entries.insert(line);
            }
        }
        debug!(path = %path.display(), entries = entries.len(), "file ledger hydrated");

        Ok(Self {
            inner: Mutex::new(Inner { entries, file }),
        })
    }
}

#[async_trait]
impl Ledger for FileLedger {
    async fn add(&self, identity: &str) -> Result<(), LedgerError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| LedgerError::Backend(e.to_string()))?;
        if inner.entries.contains(identity) {
            return Ok(());
        }
        writeln!(inner.file, "{identity}")?;
        inner.file.flush()?;
        inner.entries.insert(identity.to_string());
        Ok(())
    }

    async fn contains(&self, identity: &str) -> Result<bool, LedgerError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| LedgerError::Backend(e.to_string()))?;
        Ok(inner.entries.contains(identity))
    }
}
