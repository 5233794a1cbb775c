use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::event::{ChangeEvent, ChangeKind};

/// Single replica operation derived from a journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaOp {
    Copy { name: String },
    Remove { name: String },
}

impl ReplicaOp {
    pub fn from_event(event: &ChangeEvent) -> Option<Self> {
        let name = event.file_name();
        match event.kind {
            ChangeKind::Created | ChangeKind::Changed => Some(ReplicaOp::Copy { name }),
            ChangeKind::Deleted => Some(ReplicaOp::Remove { name }),
            ChangeKind::Error => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ReplicaOp::Copy { name } | ReplicaOp::Remove { name } => name,
        }
    }
}

#[async_trait]
pub trait ReplicaFs: Send + Sync + 'static {
    async fn apply(&self, op: &ReplicaOp) -> Result<()>;
}

/// Replica that lives in a local directory next to the source.
#[derive(Debug, Clone)]
pub struct LocalReplica {
    source: PathBuf,
    replica: PathBuf,
}

impl LocalReplica {
    pub fn new(source: impl Into<PathBuf>, replica: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            replica: replica.into(),
        }
    }
}

#[async_trait]
impl ReplicaFs for LocalReplica {
    async fn apply(&self, op: &ReplicaOp) -> Result<()> {
        match op {
            ReplicaOp::Copy { name } => {
                let from = self.source.join(name);
                let to = self.replica.join(name);
                tokio::fs::copy(&from, &to)
                    .await
                    .with_context(|| format!("copy {} -> {}", from.display(), to.display()))?;
            }
            ReplicaOp::Remove { name } => {
                let target = self.replica.join(name);
                match tokio::fs::remove_file(&target).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(e).with_context(|| format!("remove {}", target.display()))
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn errors_map_to_no_op() {
        assert_eq!(ReplicaOp::from_event(&ChangeEvent::error("boom")), None);
        assert_eq!(
            ReplicaOp::from_event(&ChangeEvent::changed("/src/a.txt")),
            Some(ReplicaOp::Copy { name: "a.txt".into() })
        );
        assert_eq!(
            ReplicaOp::from_event(&ChangeEvent::deleted("a.txt")),
            Some(ReplicaOp::Remove { name: "a.txt".into() })
        );
    }

    #[tokio::test]
    async fn copy_overwrites_and_remove_tolerates_absence() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::write(src.path().join("a.txt"), "new").unwrap();
        fs::write(dst.path().join("a.txt"), "old").unwrap();
        let replica = LocalReplica::new(src.path(), dst.path());

        replica.apply(&ReplicaOp::Copy { name: "a.txt".into() }).await.unwrap();
        assert_eq!(fs::read_to_string(dst.path().join("a.txt")).unwrap(), "new");

        replica.apply(&ReplicaOp::Remove { name: "a.txt".into() }).await.unwrap();
        assert!(!dst.path().join("a.txt").exists());
        replica.apply(&ReplicaOp::Remove { name: "a.txt".into() }).await.unwrap();
    }

    #[tokio::test]
    async fn copy_of_vanished_source_fails() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        let replica = LocalReplica::new(src.path(), dst.path());
        assert!(replica.apply(&ReplicaOp::Copy { name: "gone.txt".into() }).await.is_err());
    }
}
