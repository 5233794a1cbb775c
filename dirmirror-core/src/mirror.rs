use crate::{
    audit::AuditLog,
    config::MirrorConfig,
    filter::NameFilter,
    journal::ChangeJournal,
    normalizer::EventNormalizer,
    reconcile::reconcile,
    replica::LocalReplica,
    sync::SyncEngine,
    watcher,
};
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch::{self, Ref};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Public handle returned to callers for controlling a running mirror.
#[derive(Debug)]
pub struct MirrorHandle {
    cfg: MirrorConfig,
    cancel: CancellationToken,
    state_rx: watch::Receiver<MirrorState>,
    join: JoinHandle<Result<()>>,
}

impl MirrorHandle {
    pub fn config(&self) -> &MirrorConfig {
        &self.cfg
    }

    /// Ask both loops to stop after their in-flight work.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> Ref<'_, MirrorState> {
        self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<MirrorState> {
        self.state_rx.clone()
    }

    /// Wait until the mirror has shut down.
    pub async fn wait(self) -> Result<()> {
        self.join
            .await
            .map_err(|e| anyhow!("mirror task: {e}"))?
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorState {
    Idle,
    Reconciling,
    Running,
    Error(String),
}

pub(crate) struct Mirror {
    cfg: MirrorConfig,
}

impl Mirror {
    pub fn new(cfg: MirrorConfig) -> Self {
        Self { cfg }
    }

    pub async fn run(
        self,
        cancel: CancellationToken,
        state_tx: watch::Sender<MirrorState>,
    ) -> Result<()> {
        match self.run_inner(&cancel, &state_tx).await {
            Ok(()) => {
                let _ = state_tx.send(MirrorState::Idle);
                Ok(())
            }
            Err(e) => {
                error!("mirror stopped: {e:#}");
                let _ = state_tx.send(MirrorState::Error(format!("{e:#}")));
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        cancel: &CancellationToken,
        state_tx: &watch::Sender<MirrorState>,
    ) -> Result<()> {
        let source = resolve(&self.cfg.source);
        let replica = resolve(&self.cfg.replica);
        let log_dir = resolve(&self.cfg.log_dir);

        let journal_path = log_dir.join(MirrorConfig::JOURNAL_FILE);
        let audit_path = log_dir.join(MirrorConfig::AUDIT_FILE);
        let journal = Arc::new(ChangeJournal::open(&journal_path)?);
        let audit = Arc::new(AuditLog::open(&audit_path));
        let filter = NameFilter::new(&self.cfg.include, &self.cfg.exclude)
            .ignore_path(journal_path)
            .ignore_path(audit_path);

        let _ = state_tx.send(MirrorState::Reconciling);
        {
            let (source, replica, filter) = (source.clone(), replica.clone(), filter.clone());
            tokio::task::spawn_blocking(move || reconcile(&source, &replica, &filter))
                .await
                .map_err(|e| anyhow!("reconcile task: {e}"))??;
        }

        let normalizer = Arc::new(
            EventNormalizer::new(
                Arc::clone(&journal),
                audit,
                Duration::from_millis(self.cfg.quiet_window_ms),
            )
            .with_filter(filter),
        );
        let engine = SyncEngine::new(journal, LocalReplica::new(&source, &replica));
        let interval = Duration::from_secs(self.cfg.interval_secs);

        let _ = state_tx.send(MirrorState::Running);
        info!(
            "mirroring {} -> {} every {}s",
            source.display(),
            replica.display(),
            self.cfg.interval_secs
        );
        let watch_loop = async {
            let res = watcher::watch(&source, normalizer, cancel.clone()).await;
            if res.is_err() {
                // without a subscription there is nothing left to sync
                cancel.cancel();
            }
            res
        };
        let (watched, ()) = tokio::join!(watch_loop, engine.run(interval, cancel.clone()));
        watched
    }
}

/// Absolute form of `path` so watch events compare equal to configured paths.
fn resolve(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Start a mirror on the current tokio runtime.
pub fn spawn_mirror(cfg: MirrorConfig) -> MirrorHandle {
    spawn_mirror_with(cfg, CancellationToken::new())
}

/// Like [`spawn_mirror`], stopping when `cancel` (or a parent token) fires.
pub fn spawn_mirror_with(cfg: MirrorConfig, cancel: CancellationToken) -> MirrorHandle {
    let (state_tx, state_rx) = watch::channel(MirrorState::Idle);
    let mirror = Mirror::new(cfg.clone());
    let join = tokio::spawn(mirror.run(cancel.clone(), state_tx));
    MirrorHandle {
        cfg,
        cancel,
        state_rx,
        join,
    }
}
