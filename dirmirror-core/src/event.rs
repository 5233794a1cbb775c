use notify::{
    event::{CreateKind, ModifyKind, RemoveKind, RenameMode},
    EventKind,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Changed,
    Deleted,
    Error,
}

/// One normalized change. `path` is the full path for watch events and the
/// error text for `Error` entries; journal entries hold the bare file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "event")]
    pub kind: ChangeKind,
    #[serde(rename = "file")]
    pub path: String,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn created(path: impl Into<String>) -> Self {
        Self::new(ChangeKind::Created, path)
    }

    pub fn changed(path: impl Into<String>) -> Self {
        Self::new(ChangeKind::Changed, path)
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        Self::new(ChangeKind::Deleted, path)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ChangeKind::Error, message)
    }

    pub fn is_error(&self) -> bool {
        self.kind == ChangeKind::Error
    }

    /// Base name the journal and the replica key on.
    pub fn file_name(&self) -> String {
        Path::new(&self.path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.clone())
    }
}

/// Native notification reduced to the three kinds the normalizer de-duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawChange {
    Created(PathBuf),
    Changed(PathBuf),
    Deleted(PathBuf),
}

impl RawChange {
    pub fn path(&self) -> &Path {
        match self {
            RawChange::Created(p) | RawChange::Changed(p) | RawChange::Deleted(p) => p,
        }
    }
}

/// Convert a notify::Event into zero or more RawChange.
///
/// Directory events are dropped: only a flat set of files is mirrored. A rename
/// becomes a delete of the old name (`From`) and a create of the new one (`To`).
pub fn event_to_changes(event: notify::Event) -> Vec<RawChange> {
    let mut changes = Vec::new();
    match event.kind {
        EventKind::Create(CreateKind::File) | EventKind::Create(CreateKind::Any) => {
            changes.extend(event.paths.into_iter().map(RawChange::Created));
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            changes.extend(event.paths.into_iter().map(RawChange::Deleted));
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            changes.extend(event.paths.into_iter().map(RawChange::Created));
        }
        // inotify reports From and To separately, then repeats them as Both
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {}
        EventKind::Modify(ModifyKind::Name(_)) => {
            // backend could not tell which side of the rename this is
            for p in event.paths {
                if p.exists() {
                    changes.push(RawChange::Created(p));
                } else {
                    changes.push(RawChange::Deleted(p));
                }
            }
        }
        EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Metadata(_))
        | EventKind::Modify(ModifyKind::Any) => {
            changes.extend(event.paths.into_iter().map(RawChange::Changed));
        }
        EventKind::Remove(RemoveKind::File) | EventKind::Remove(RemoveKind::Any) => {
            changes.extend(event.paths.into_iter().map(RawChange::Deleted));
        }
        _ => {}
    }
    changes
}
