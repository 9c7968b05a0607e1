//! Temp-file-then-rename writes
//!
//! Output is written to a hidden file next to its final target and renamed into place
//! only after the writer succeeds. If the writing future is dropped (a killed worker)
//! or fails, the staging file is removed, so a final name never holds a truncated file.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use tunemirror_types::{Error, Result};
use uuid::Uuid;

/// Prefix shared by every staging file name
pub const STAGING_PREFIX: &str = ".tunemirror-";

/// A hidden work file that becomes `target` on commit
#[derive(Debug)]
pub struct StagingFile {
    path: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagingFile {
    /// Reserve a staging path next to `target`, creating parent directories
    ///
    /// The staging name keeps the target's extension because encoders pick the output
    /// format from it.
    pub async fn for_target(target: &Path) -> Result<Self> {
        let parent = target
            .parent()
            .ok_or_else(|| Error::io(format!("'{}' has no parent directory", target.display())))?;

        fs::create_dir_all(parent).await.map_err(|e| Error::Io {
            message: format!("Failed to create directory '{}': {}", parent.display(), e),
        })?;

        let mut name = format!("{}{}", STAGING_PREFIX, Uuid::new_v4().simple());
        if let Some(ext) = target.extension() {
            name.push('.');
            name.push_str(&ext.to_string_lossy());
        }

        Ok(Self {
            path: parent.join(name),
            target: target.to_path_buf(),
            committed: false,
        })
    }

    /// Path the writer should write to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final destination
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Move the staging file onto its target
    pub async fn commit(mut self) -> Result<()> {
        fs::rename(&self.path, &self.target)
            .await
            .map_err(|e| Error::Io {
                message: format!(
                    "Failed to move '{}' to '{}': {}",
                    self.path.display(),
                    self.target.display(),
                    e
                ),
            })?;
        self.committed = true;
        debug!("Committed {}", self.target.display());
        Ok(())
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if !self.committed && self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("Failed to remove staging file {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Whether a file name looks like a leftover staging file
pub fn is_staging_name(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with(STAGING_PREFIX))
}
