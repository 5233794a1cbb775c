use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::event::ChangeEvent;
use crate::journal::ChangeJournal;
use crate::replica::{ReplicaFs, ReplicaOp};

/// Outcome of applying one drained snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub copied: usize,
    pub removed: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.copied + self.removed + self.failed == 0
    }
}

pub struct SyncEngine<R> {
    journal: Arc<ChangeJournal>,
    replica: R,
}

impl<R: ReplicaFs> SyncEngine<R> {
    pub fn new(journal: Arc<ChangeJournal>, replica: R) -> Self {
        Self { journal, replica }
    }

    /// Apply every entry independently. A failed entry is logged and skipped;
    /// it is not retried on a later tick.
    pub async fn apply(&self, snapshot: Vec<ChangeEvent>) -> SyncReport {
        let mut report = SyncReport::default();
        for event in &snapshot {
            let Some(op) = ReplicaOp::from_event(event) else {
                continue;
            };
            match self.replica.apply(&op).await {
                Ok(()) => match op {
                    ReplicaOp::Copy { .. } => report.copied += 1,
                    ReplicaOp::Remove { .. } => report.removed += 1,
                },
                Err(e) => {
                    warn!("skipping {}: {e:#}", op.name());
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Drain the journal and apply what was pending.
    pub async fn drain_once(&self) -> Result<SyncReport> {
        let journal = Arc::clone(&self.journal);
        let snapshot = tokio::task::spawn_blocking(move || journal.drain_and_clear())
            .await
            .map_err(|e| anyhow!("journal drain task: {e}"))??;
        if snapshot.is_empty() {
            return Ok(SyncReport::default());
        }
        let report = self.apply(snapshot).await;
        info!(
            copied = report.copied,
            removed = report.removed,
            failed = report.failed,
            "replica updated"
        );
        Ok(report)
    }

    /// Sleep-then-drain until `cancel` fires. Cancellation is only observed
    /// while sleeping, so a drain in progress always completes.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            if let Err(e) = self.drain_once().await {
                error!("sync drain failed: {e:#}");
            }
        }
        info!("sync loop stopped");
    }
}
