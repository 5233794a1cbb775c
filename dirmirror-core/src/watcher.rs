use anyhow::{anyhow, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::normalizer::EventNormalizer;

/// Watch `source` (non-recursive) until `cancel` fires.
///
/// Notifications are handled on the backend's delivery thread. The subscription
/// is owned by this future, so it is released on every exit path, including
/// the future being dropped. On cancel it is released on the blocking pool:
/// unwatching waits for the delivery thread, which may be parked in the
/// normalizer's quiet window.
pub async fn watch(
    source: &Path,
    normalizer: Arc<EventNormalizer>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut watcher = RecommendedWatcher::new(
        move |res| normalizer.handle(res),
        notify::Config::default(),
    )
    .map_err(|e| anyhow!("create watcher: {e}"))?;
    watcher
        .watch(source, RecursiveMode::NonRecursive)
        .map_err(|e| anyhow!("watch {}: {e}", source.display()))?;
    info!("watching {}", source.display());

    cancel.cancelled().await;

    let source = source.to_path_buf();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = watcher.unwatch(&source) {
            debug!("unwatch {}: {e}", source.display());
        }
        drop(watcher);
    })
    .await
    .map_err(|e| anyhow!("release watcher: {e}"))?;
    info!("watch loop stopped");
    Ok(())
}
