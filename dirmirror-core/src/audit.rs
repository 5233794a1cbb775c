use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::document::JsonDocument;
use crate::event::ChangeEvent;

/// Append-only record of every normalized event, errors included.
#[derive(Debug)]
pub struct AuditLog {
    doc: JsonDocument<ChangeEvent>,
    lock: Mutex<()>,
}

impl AuditLog {
    /// Opens the log at `path`; existing entries are kept.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            doc: JsonDocument::new(path),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        self.doc.path()
    }

    pub fn append(&self, event: &ChangeEvent) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut entries = self.doc.load()?;
        entries.push(event.clone());
        self.doc.replace(&entries)?;
        Ok(())
    }

    pub fn entries(&self) -> Result<Vec<ChangeEvent>> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(self.doc.load()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appends_in_arrival_order_without_coalescing() {
        let dir = tempdir().unwrap();
        let log = AuditLog::open(dir.path().join("log.json"));
        log.append(&ChangeEvent::created("/src/a.txt")).unwrap();
        log.append(&ChangeEvent::changed("/src/a.txt")).unwrap();
        log.append(&ChangeEvent::error("access denied")).unwrap();
        assert_eq!(
            log.entries().unwrap(),
            vec![
                ChangeEvent::created("/src/a.txt"),
                ChangeEvent::changed("/src/a.txt"),
                ChangeEvent::error("access denied"),
            ]
        );
    }

    #[test]
    fn reopening_keeps_history() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.json");
        AuditLog::open(&path).append(&ChangeEvent::deleted("/src/old.txt")).unwrap();

        let log = AuditLog::open(&path);
        log.append(&ChangeEvent::created("/src/new.txt")).unwrap();
        assert_eq!(log.entries().unwrap().len(), 2);
    }
}
