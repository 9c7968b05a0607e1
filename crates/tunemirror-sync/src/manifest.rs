//! Playlist and cue sheet sources
//!
//! A manifest lists the files to mirror instead of walking a directory. Relative
//! entries are resolved against the manifest's own directory, which also serves as the
//! source root when target paths are computed.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use tunemirror_types::{Error, Result};

/// Files listed by a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Directory containing the manifest
    pub root: PathBuf,
    /// Existing regular files, in listing order, without duplicates
    pub entries: Vec<PathBuf>,
}

impl Manifest {
    /// Read a playlist (one path per line) or a `.cue` sheet
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::Io {
            message: format!("Failed to read manifest '{}': {}", path.display(), e),
        })?;

        let root = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let is_cue = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("cue"));

        let entries = parse_entries(&text, &root, is_cue)
            .into_iter()
            .filter(|entry| {
                let exists = entry.is_file();
                if !exists {
                    debug!("Manifest entry not found: {}", entry.display());
                }
                exists
            })
            .collect();

        Ok(Self { root, entries })
    }
}

/// Resolve manifest lines to absolute, normalized paths
///
/// Blank lines and `#` comments are ignored. For cue sheets only the quoted path of
/// each `FILE` line is used. Duplicates are dropped, keeping the first occurrence.
pub fn parse_entries(text: &str, root: &Path, is_cue: bool) -> Vec<PathBuf> {
    let mut seen = HashSet::new();

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| if is_cue { cue_file(line) } else { Some(line) })
        .map(|entry| normalize_lexically(&root.join(entry.trim())))
        .filter(|entry| seen.insert(entry.clone()))
        .collect()
}

/// Quoted path of a cue sheet `FILE "..." TYPE` line
fn cue_file(line: &str) -> Option<&str> {
    if !line.starts_with("FILE") {
        return None;
    }
    let start = line.find('"')? + 1;
    let end = line.rfind('"')?;
    (end > start).then(|| &line[start..end])
}

/// Remove `.` and `..` components without touching the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(component),
            },
            other => normalized.push(other),
        }
    }
    normalized
}
