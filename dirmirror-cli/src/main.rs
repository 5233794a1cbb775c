use anyhow::{anyhow, Context, Result};
use clap::Parser;
use dirmirror_core::{spawn_mirror, MirrorConfig, MirrorState};
use std::{fs, path::Path, path::PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dirmirror", version, about = "DirMirror – keep a replica directory in sync with a source directory")]
struct Cli {
    /// Path to config file (YAML / JSON); flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory to watch
    #[arg(short, long)]
    source: Option<PathBuf>,
    /// Directory kept identical to the source
    #[arg(short, long)]
    replica: Option<PathBuf>,
    /// Directory for changes.json and log.json
    #[arg(short, long)]
    log_dir: Option<PathBuf>,
    /// Sync interval in seconds
    #[arg(short, long)]
    interval: Option<u64>,
}

impl Cli {
    fn into_config(self) -> Result<MirrorConfig> {
        let mut cfg = match &self.config {
            Some(path) => load_config(path)?,
            None => {
                let missing = |flag: &str| anyhow!("--{flag} is required without --config");
                MirrorConfig::new(
                    self.source.clone().ok_or_else(|| missing("source"))?,
                    self.replica.clone().ok_or_else(|| missing("replica"))?,
                    self.log_dir.clone().ok_or_else(|| missing("log-dir"))?,
                    self.interval.ok_or_else(|| missing("interval"))?,
                )
            }
        };
        if let Some(source) = self.source {
            cfg.source = source;
        }
        if let Some(replica) = self.replica {
            cfg.replica = replica;
        }
        if let Some(log_dir) = self.log_dir {
            cfg.log_dir = log_dir;
        }
        if let Some(interval) = self.interval {
            cfg.interval_secs = interval;
        }
        Ok(cfg)
    }
}

fn load_config(path: &Path) -> Result<MirrorConfig> {
    let text = fs::read_to_string(path)
        .map_err(|e| anyhow!("read config {} failed: {e}", path.display()))?;

    // Detect format by extension
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let cfg = match ext {
        "json" => serde_json::from_str(&text)?,
        _ => serde_yaml::from_str(&text)?, // default to yaml
    };
    Ok(cfg)
}

/// Create source, replica and log directories when they do not exist yet.
fn prepare_dirs(cfg: &MirrorConfig) -> Result<()> {
    for dir in [&cfg.source, &cfg.replica, &cfg.log_dir] {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Cli::parse().into_config()?;
    cfg.validate()?;
    prepare_dirs(&cfg)?;

    let handle = spawn_mirror(cfg);
    let mut states = handle.subscribe();
    println!("DirMirror running... press Ctrl+C to stop");

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("stopping");
            handle.stop();
            handle.wait().await
        }
        // startup failure (e.g. the source cannot be watched)
        _ = states.wait_for(|s| matches!(s, MirrorState::Error(_))) => {
            if let MirrorState::Error(reason) = &*handle.state() {
                error!("mirror failed: {reason}");
            }
            handle.wait().await
        }
    }
}
