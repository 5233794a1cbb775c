//! Turns native watch notifications into journal and audit entries.
//!
//! Some watch backends fire create twice for one file, and one logical edit can
//! show up as a run of modify notifications. The normalizer remembers the last
//! created and last changed path and drops the repeats before anything is
//! written.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::audit::AuditLog;
use crate::event::{event_to_changes, ChangeEvent, RawChange};
use crate::filter::NameFilter;
use crate::journal::ChangeJournal;

#[derive(Debug, Default)]
struct DedupState {
    last_created: Option<PathBuf>,
    last_changed: Option<PathBuf>,
}

pub struct EventNormalizer {
    state: Mutex<DedupState>,
    quiet_window: Duration,
    filter: NameFilter,
    journal: Arc<ChangeJournal>,
    audit: Arc<AuditLog>,
}

impl EventNormalizer {
    pub fn new(journal: Arc<ChangeJournal>, audit: Arc<AuditLog>, quiet_window: Duration) -> Self {
        Self {
            state: Mutex::new(DedupState::default()),
            quiet_window,
            filter: NameFilter::default(),
            journal,
            audit,
        }
    }

    pub fn with_filter(mut self, filter: NameFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Entry point for the watcher callback.
    pub fn handle(&self, res: notify::Result<notify::Event>) {
        match res {
            Ok(event) => {
                for change in event_to_changes(event) {
                    if !self.filter.check(change.path()) {
                        continue;
                    }
                    if let Some(ev) = self.normalize(change) {
                        self.emit(&ev);
                    }
                }
            }
            Err(e) => {
                warn!("watch error: {e}");
                self.emit(&ChangeEvent::error(e.to_string()));
            }
        }
    }

    /// Apply the de-duplication rules; `None` means the change was a repeat.
    ///
    /// A repeated change for the same path blocks the caller for the quiet
    /// window, which throttles a burst of writes to one event per window.
    pub fn normalize(&self, change: RawChange) -> Option<ChangeEvent> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match change {
            RawChange::Created(path) => {
                let repeat = state.last_created.as_ref() == Some(&path);
                let event = ChangeEvent::created(path.to_string_lossy());
                state.last_created = Some(path);
                (!repeat).then_some(event)
            }
            RawChange::Changed(path) => {
                if state.last_changed.as_ref() == Some(&path) {
                    thread::sleep(self.quiet_window);
                    state.last_changed = None;
                    return None;
                }
                let event = ChangeEvent::changed(path.to_string_lossy());
                state.last_changed = Some(path);
                Some(event)
            }
            RawChange::Deleted(path) => Some(ChangeEvent::deleted(path.to_string_lossy())),
        }
    }

    /// Write an accepted event to the audit log and the journal. Persistence
    /// failures are logged; the watch keeps running.
    pub fn emit(&self, event: &ChangeEvent) {
        debug!(kind = ?event.kind, path = %event.path, "change observed");
        if let Err(e) = self.audit.append(event) {
            warn!("audit log {}: {e:#}", self.audit.path().display());
        }
        if let Err(e) = self.journal.record(event) {
            warn!("journal {}: {e:#}", self.journal.path().display());
        }
    }
}
