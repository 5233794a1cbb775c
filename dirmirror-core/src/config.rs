use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Glob pattern (wrapper type for clarity)
/// Stored as plain String; compiled to a `globset::Glob` by `NameFilter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    pub source:        PathBuf,
    pub replica:       PathBuf,
    /// Directory holding `changes.json` (pending journal) and `log.json` (audit log)
    pub log_dir:       PathBuf,
    /// Seconds between two journal drains
    #[serde(default = "MirrorConfig::default_interval_secs")]
    pub interval_secs: u64,
    /// Pause applied after a repeated change notification for the same path
    #[serde(default = "MirrorConfig::default_quiet_window_ms")]
    pub quiet_window_ms: u64,
    #[serde(default)]
    pub include:       Vec<Pattern>,
    #[serde(default)]
    pub exclude:       Vec<Pattern>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} path must not be empty")]
    EmptyPath(&'static str),
    #[error("replica path must be different from the source path: {0}")]
    SameDirectory(PathBuf),
    #[error("sync interval must be at least 1 second, got {0}")]
    Interval(u64),
}

impl MirrorConfig {
    pub const JOURNAL_FILE: &'static str = "changes.json";
    pub const AUDIT_FILE: &'static str = "log.json";

    pub fn new(
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
        interval_secs: u64,
    ) -> Self {
        Self {
            source: source.into(),
            replica: replica.into(),
            log_dir: log_dir.into(),
            interval_secs,
            quiet_window_ms: Self::default_quiet_window_ms(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    fn default_interval_secs() -> u64 { 10 }
    fn default_quiet_window_ms() -> u64 { 500 }

    pub fn journal_path(&self) -> PathBuf {
        self.log_dir.join(Self::JOURNAL_FILE)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.log_dir.join(Self::AUDIT_FILE)
    }

    /// Checks the operator-supplied values. The engine itself assumes a
    /// validated config and never calls this.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("source"));
        }
        if self.replica.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("replica"));
        }
        if self.log_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("log"));
        }
        if self.source == self.replica {
            return Err(ConfigError::SameDirectory(self.replica.clone()));
        }
        if self.interval_secs < 1 {
            return Err(ConfigError::Interval(self.interval_secs));
        }
        Ok(())
    }
}
