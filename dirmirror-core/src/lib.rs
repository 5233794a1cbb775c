//! Core library for DirMirror – keeps a replica directory mirroring a source directory.
//!
//! Startup runs a full [`reconcile`] pass. After that two loops run side by
//! side: the watcher feeds normalized events into the [`ChangeJournal`] and the
//! [`AuditLog`], and the [`SyncEngine`] drains the journal into the replica on a
//! fixed interval.

mod audit;
mod config;
mod document;
mod event;
mod filter;
mod journal;
mod mirror;
mod normalizer;
mod reconcile;
mod replica;
mod sync;
mod watcher;

pub use audit::AuditLog;
pub use config::{ConfigError, MirrorConfig, Pattern};
pub use document::{DocumentError, JsonDocument};
pub use event::{event_to_changes, ChangeEvent, ChangeKind, RawChange};
pub use filter::NameFilter;
pub use journal::ChangeJournal;
pub use mirror::{spawn_mirror, spawn_mirror_with, MirrorHandle, MirrorState};
pub use normalizer::EventNormalizer;
pub use reconcile::{reconcile, ReconcileReport};
pub use replica::{LocalReplica, ReplicaFs, ReplicaOp};
pub use sync::{SyncEngine, SyncReport};
pub use watcher::watch;

pub use tokio_util::sync::CancellationToken;
