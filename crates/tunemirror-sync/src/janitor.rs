//! Removing stale target files and empty directories

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tunemirror_media::MediaDescriptor;
use tunemirror_rules::RuleBook;
use tunemirror_types::MediaProbe;
use walkdir::WalkDir;

/// What the janitor removed (or would remove, in dry-run mode)
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    /// Stale files
    pub removed_files: Vec<PathBuf>,
    /// Empty directories, deepest first
    pub pruned_directories: Vec<PathBuf>,
    /// Paths that could not be removed
    pub failures: Vec<PathBuf>,
}

/// Deletes target files that no source produced
#[derive(Clone)]
pub struct Janitor {
    rules: Arc<RuleBook>,
    probe: Arc<dyn MediaProbe>,
    dry_run: bool,
}

impl Janitor {
    /// Create a janitor
    pub fn new(rules: Arc<RuleBook>, probe: Arc<dyn MediaProbe>, dry_run: bool) -> Self {
        Self {
            rules,
            probe,
            dry_run,
        }
    }

    /// Clean `target`, sparing every path in `keep`
    ///
    /// A file outside the keep set is deleted when the remove-missing rules resolve to
    /// `true` for it. Afterwards every directory below `target` left without entries is
    /// removed; `target` itself always stays.
    pub fn clean(&self, target: &Path, keep: &HashSet<PathBuf>) -> CleanupReport {
        let mut report = CleanupReport::default();
        let mut gone = HashSet::new();

        let files: Vec<PathBuf> = WalkDir::new(target)
            .min_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Cannot read {}: {}", target.display(), e);
                    None
                }
            })
            .filter(|entry| !entry.file_type().is_dir())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| !keep.contains(path))
            .collect();

        for path in files {
            if !self.should_remove(&path) {
                continue;
            }

            if self.dry_run {
                info!("would remove {}", path.display());
            } else if let Err(e) = std::fs::remove_file(&path) {
                warn!("Failed to remove {}: {}", path.display(), e);
                report.failures.push(path);
                continue;
            } else {
                info!("remove {}", path.display());
            }
            gone.insert(path.clone());
            report.removed_files.push(path);
        }

        let directories: Vec<PathBuf> = WalkDir::new(target)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_dir())
            .map(walkdir::DirEntry::into_path)
            .collect();

        for dir in directories {
            if !is_empty(&dir, &gone) {
                continue;
            }

            if self.dry_run {
                debug!("would prune {}", dir.display());
            } else if let Err(e) = std::fs::remove_dir(&dir) {
                warn!("Failed to remove directory {}: {}", dir.display(), e);
                report.failures.push(dir);
                continue;
            } else {
                debug!("prune {}", dir.display());
            }
            gone.insert(dir.clone());
            report.pruned_directories.push(dir);
        }

        report
    }

    fn should_remove(&self, path: &Path) -> bool {
        match MediaDescriptor::open(path, Arc::clone(&self.probe)) {
            Ok(file) => self
                .rules
                .remove_missing_rules()
                .resolve(&file)
                .unwrap_or(false),
            Err(e) => {
                debug!("Not removing {}: {}", path.display(), e);
                false
            }
        }
    }
}

impl std::fmt::Debug for Janitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Janitor")
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

/// Whether every entry of `dir` has already been removed
fn is_empty(dir: &Path, gone: &HashSet<PathBuf>) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| {
            entries.all(|entry| entry.is_ok_and(|entry| gone.contains(&entry.path())))
        })
        .unwrap_or(false)
}
