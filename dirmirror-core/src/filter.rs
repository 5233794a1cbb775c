use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

use crate::config::Pattern;

/// Runtime filter compiled from include / exclude pattern lists.
///
/// Patterns match the bare file name, since only one flat directory is mirrored.
#[derive(Debug, Clone)]
pub struct NameFilter {
    include: GlobSet,
    exclude: GlobSet,
    ignored: Vec<PathBuf>,
}

impl Default for NameFilter {
    fn default() -> Self {
        Self::new(&[], &[])
    }
}

impl NameFilter {
    /// Build a filter from lists. Empty include list means "include all".
    pub fn new(include: &[Pattern], exclude: &[Pattern]) -> Self {
        Self {
            include: compile(include),
            exclude: compile(exclude),
            ignored: Vec::new(),
        }
    }

    /// Never accept `path` nor its temp siblings, e.g. the journal when it
    /// lives inside the watched directory.
    pub fn ignore_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignored.push(path.into());
        self
    }

    /// Determine whether a given path should be mirrored.
    pub fn check<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        let Some(name) = path.file_name() else {
            return false;
        };
        if self.is_ignored(path) {
            return false;
        }
        let included = self.include.is_empty() || self.include.is_match(name);
        included && !self.exclude.is_match(name)
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignored.iter().any(|ignored| {
            if ignored == path {
                return true;
            }
            // `.changes.json.<pid>.tmp` written next to the document
            match (ignored.file_name(), path.file_name(), ignored.parent(), path.parent()) {
                (Some(doc), Some(name), Some(a), Some(b)) if a == b => {
                    let prefix = format!(".{}.", doc.to_string_lossy());
                    let name = name.to_string_lossy();
                    name.starts_with(&prefix) && name.ends_with(".tmp")
                }
                _ => false,
            }
        })
    }
}

fn compile(patterns: &[Pattern]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    // compile patterns, ignore compile errors individually
    for pat in patterns {
        if let Ok(g) = Glob::new(&pat.0) {
            builder.add(g);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_basic() {
        let include = vec![Pattern("*.txt".into()), Pattern("*.png".into())];
        let exclude = vec![Pattern("~*".into())];
        let filter = NameFilter::new(&include, &exclude);
        assert!(filter.check("/src/report.txt"));
        assert!(filter.check("image.png"));
        assert!(!filter.check("/src/~report.txt"));
        assert!(!filter.check("/src/notes.md"));
    }

    #[test]
    fn empty_lists_accept_everything() {
        let filter = NameFilter::default();
        assert!(filter.check("/src/anything.bin"));
        assert!(filter.check("no-extension"));
    }

    #[test]
    fn ignored_document_and_temp_files() {
        let filter = NameFilter::default().ignore_path("/src/changes.json");
        assert!(!filter.check("/src/changes.json"));
        assert!(!filter.check("/src/.changes.json.4242.tmp"));
        assert!(filter.check("/src/other.json"));
        assert!(filter.check("/elsewhere/.changes.json.1.tmp"));
    }

    #[test]
    fn invalid_pattern_is_skipped() {
        let filter = NameFilter::new(&[Pattern("[".into()), Pattern("*.rs".into())], &[]);
        assert!(filter.check("main.rs"));
        assert!(!filter.check("main.c"));
    }
}
