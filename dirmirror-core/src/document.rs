//! Durable JSON documents holding an ordered collection of records.
//!
//! Every successful write fully replaces the previous content: the new content
//! goes to a temp file in the same directory, is flushed to disk, and is then
//! renamed over the target. A failed write leaves the old document intact.

use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DocumentError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug)]
pub struct JsonDocument<T> {
    path: PathBuf,
    _records: PhantomData<fn() -> T>,
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _records: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or blank documents read as an empty collection.
    pub fn load(&self) -> Result<Vec<T>, DocumentError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DocumentError::io(&self.path, e)),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|source| DocumentError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn replace(&self, records: &[T]) -> Result<(), DocumentError> {
        let json = serde_json::to_vec_pretty(records).map_err(|source| DocumentError::Parse {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, &json)
    }

    pub fn reset(&self) -> Result<(), DocumentError> {
        self.replace(&[])
    }
}

/// Temp file name used next to `path` while replacing it.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    path.with_file_name(temp_name)
}

fn write_atomic(path: &Path, content: &[u8]) -> Result<(), DocumentError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| DocumentError::io(parent, e))?;
    }

    // same directory, so the rename never crosses filesystems
    let temp_path = temp_path_for(path);
    let written = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .and_then(|mut file| {
            file.write_all(content)?;
            file.sync_all()
        });
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(DocumentError::io(&temp_path, e));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        DocumentError::io(path, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ChangeEvent;
    use tempfile::tempdir;

    #[test]
    fn missing_and_blank_documents_are_empty() {
        let dir = tempdir().unwrap();
        let doc: JsonDocument<ChangeEvent> = JsonDocument::new(dir.path().join("log.json"));
        assert!(doc.load().unwrap().is_empty());

        fs::write(doc.path(), "  \n").unwrap();
        assert!(doc.load().unwrap().is_empty());
    }

    #[test]
    fn replace_overwrites_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let doc = JsonDocument::new(dir.path().join("changes.json"));
        doc.replace(&[ChangeEvent::created("a.txt"), ChangeEvent::deleted("b.txt")])
            .unwrap();
        doc.replace(&[ChangeEvent::changed("c.txt")]).unwrap();

        assert_eq!(doc.load().unwrap(), vec![ChangeEvent::changed("c.txt")]);
        assert!(!temp_path_for(doc.path()).exists());
        let names: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn malformed_content_is_reported() {
        let dir = tempdir().unwrap();
        let doc: JsonDocument<ChangeEvent> = JsonDocument::new(dir.path().join("changes.json"));
        fs::write(doc.path(), "[{\"event\":").unwrap();
        assert!(matches!(doc.load(), Err(DocumentError::Parse { .. })));
    }

    #[test]
    fn failed_write_keeps_previous_content() {
        let dir = tempdir().unwrap();
        let doc = JsonDocument::new(dir.path().join("log.json"));
        doc.replace(&[ChangeEvent::created("kept.txt")]).unwrap();

        // a directory squatting on the temp name makes the write fail
        fs::create_dir(temp_path_for(doc.path())).unwrap();
        assert!(doc.replace(&[ChangeEvent::created("lost.txt")]).is_err());
        assert_eq!(doc.load().unwrap(), vec![ChangeEvent::created("kept.txt")]);
    }
}
