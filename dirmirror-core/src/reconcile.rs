use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::filter::NameFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    pub removed: usize,
    pub copied: usize,
}

/// Full mirror run once at startup: empty the replica, then copy every source
/// file into it. Journal and audit log are not consulted; names rejected by
/// `filter` are left untouched on both sides.
pub fn reconcile(source: &Path, replica: &Path, filter: &NameFilter) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();
    // an unreadable source must fail before the replica is touched
    let sources = files_in(source)?;

    // names outside the filter are not part of the mirror, on either side
    for path in files_in(replica)? {
        if !filter.check(&path) {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => report.removed += 1,
            Err(e) => warn!("reconcile: remove {}: {e}", path.display()),
        }
    }

    for path in sources {
        if !filter.check(&path) {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        let target = replica.join(name);
        match fs::copy(&path, &target) {
            Ok(_) => report.copied += 1,
            Err(e) => warn!("reconcile: copy {} -> {}: {e}", path.display(), target.display()),
        }
    }

    info!(
        removed = report.removed,
        copied = report.copied,
        "replica reconciled with {}",
        source.display()
    );
    Ok(report)
}

/// Regular files directly inside `dir`; subdirectories are not descended.
fn files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("list {}", dir.display()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Pattern;
    use tempfile::tempdir;

    fn snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
        let mut files: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.is_file())
            .map(|p| (p.file_name().unwrap().to_string_lossy().into_owned(), fs::read(&p).unwrap()))
            .collect();
        files.sort();
        files
    }

    #[test]
    fn replica_becomes_copy_of_source() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::write(src.path().join("report.txt"), "q3").unwrap();
        fs::write(src.path().join("image.png"), [0u8, 1, 2]).unwrap();
        fs::write(dst.path().join("report.txt"), "outdated").unwrap();
        fs::write(dst.path().join("orphan.txt"), "drift").unwrap();

        let report = reconcile(src.path(), dst.path(), &NameFilter::default()).unwrap();

        assert_eq!(report, ReconcileReport { removed: 2, copied: 2 });
        assert_eq!(snapshot(dst.path()), snapshot(src.path()));
    }

    #[test]
    fn running_twice_gives_the_same_replica() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::write(src.path().join("a.txt"), "alpha").unwrap();
        fs::write(src.path().join("b.bin"), [9u8; 64]).unwrap();

        reconcile(src.path(), dst.path(), &NameFilter::default()).unwrap();
        let first = snapshot(dst.path());
        reconcile(src.path(), dst.path(), &NameFilter::default()).unwrap();
        assert_eq!(snapshot(dst.path()), first);
    }

    #[test]
    fn subdirectories_are_left_alone() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::create_dir(src.path().join("nested")).unwrap();
        fs::write(src.path().join("nested").join("deep.txt"), "x").unwrap();
        fs::create_dir(dst.path().join("keep")).unwrap();

        let report = reconcile(src.path(), dst.path(), &NameFilter::default()).unwrap();
        assert_eq!(report, ReconcileReport::default());
        assert!(dst.path().join("keep").is_dir());
        assert!(!dst.path().join("deep.txt").exists());
    }

    #[test]
    fn filter_limits_copied_files() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::write(src.path().join("a.txt"), "a").unwrap();
        fs::write(src.path().join("a.tmp"), "t").unwrap();
        let filter = NameFilter::new(&[], &[Pattern("*.tmp".into())]);

        fs::write(dst.path().join("keep.tmp"), "local").unwrap();

        let report = reconcile(src.path(), dst.path(), &filter).unwrap();
        assert_eq!(report, ReconcileReport { removed: 0, copied: 1 });
        assert!(!dst.path().join("a.tmp").exists());
        assert!(dst.path().join("keep.tmp").exists());
    }

    #[test]
    fn missing_source_is_an_error() {
        let dst = tempdir().unwrap();
        let missing = dst.path().join("nope");
        assert!(reconcile(&missing, dst.path(), &NameFilter::default()).is_err());
    }

    #[test]
    fn unreadable_source_leaves_replica_intact() {
        let dst = tempdir().unwrap();
        fs::write(dst.path().join("precious.txt"), "keep me").unwrap();
        let missing = dst.path().join("absent");

        assert!(reconcile(&missing, dst.path(), &NameFilter::default()).is_err());
        assert_eq!(fs::read_to_string(dst.path().join("precious.txt")).unwrap(), "keep me");
    }
}
