//! Pending-change journal: one entry per file name, last write wins.
//!
//! The document on disk is the only hand-off between the watch loop and the
//! sync loop. `record` and `drain_and_clear` hold the same lock for their whole
//! read-modify-write, so a record either lands in the drained snapshot or in
//! the emptied journal, never in between.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::document::JsonDocument;
use crate::event::ChangeEvent;

#[derive(Debug)]
pub struct ChangeJournal {
    doc: JsonDocument<ChangeEvent>,
    lock: Mutex<()>,
}

impl ChangeJournal {
    /// Opens the journal at `path`, starting from an empty document.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let journal = Self {
            doc: JsonDocument::new(path),
            lock: Mutex::new(()),
        };
        journal
            .doc
            .reset()
            .with_context(|| format!("initialise journal {}", journal.path().display()))?;
        Ok(journal)
    }

    pub fn path(&self) -> &Path {
        self.doc.path()
    }

    /// Insert or overwrite the entry for the event's file name. Error events
    /// are audit-only and leave the journal untouched.
    pub fn record(&self, event: &ChangeEvent) -> Result<()> {
        if event.is_error() {
            return Ok(());
        }
        let name = event.file_name();
        let _guard = self.guard();
        let mut entries = self.doc.load()?;
        match entries.iter_mut().find(|entry| entry.path == name) {
            Some(entry) => entry.kind = event.kind,
            None => entries.push(ChangeEvent::new(event.kind, name)),
        }
        self.doc.replace(&entries)?;
        Ok(())
    }

    /// Take every pending entry and leave an empty journal behind.
    pub fn drain_and_clear(&self) -> Result<Vec<ChangeEvent>> {
        let _guard = self.guard();
        let entries = self.doc.load()?;
        if !entries.is_empty() {
            self.doc.reset()?;
        }
        Ok(entries)
    }

    /// Pending entries without draining them.
    pub fn pending(&self) -> Result<Vec<ChangeEvent>> {
        let _guard = self.guard();
        Ok(self.doc.load()?)
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // the mutex guards no data, a panicked holder leaves nothing half-updated in memory
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
