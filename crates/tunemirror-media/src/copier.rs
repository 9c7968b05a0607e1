//! Byte-for-byte file copies

use crate::staging::StagingFile;
use std::path::Path;
use tokio::fs;
use tracing::debug;
use tunemirror_types::{Error, Result};

/// Copies files into the mirror through a staging file
#[derive(Debug, Clone)]
pub struct FileCopier {
    preserve_timestamps: bool,
}

impl FileCopier {
    /// Create a copier
    pub fn new(preserve_timestamps: bool) -> Self {
        Self {
            preserve_timestamps,
        }
    }

    /// Copy `source` to `destination`, creating parent directories
    ///
    /// Returns the number of bytes copied.
    pub async fn copy(&self, source: &Path, destination: &Path) -> Result<u64> {
        let staging = StagingFile::for_target(destination).await?;

        let bytes = fs::copy(source, staging.path())
            .await
            .map_err(|e| Error::Io {
                message: format!(
                    "Failed to copy '{}' to '{}': {}",
                    source.display(),
                    destination.display(),
                    e
                ),
            })?;

        if self.preserve_timestamps {
            let metadata = fs::metadata(source).await.map_err(|e| Error::Io {
                message: format!("Failed to get metadata for '{}': {}", source.display(), e),
            })?;

            if let Ok(modified) = metadata.modified() {
                filetime::set_file_mtime(
                    staging.path(),
                    filetime::FileTime::from_system_time(modified),
                )
                .map_err(|e| Error::Io {
                    message: format!(
                        "Failed to set modification time for '{}': {}",
                        destination.display(),
                        e
                    ),
                })?;
            }
        }

        staging.commit().await?;
        debug!("Copied: {} -> {}", source.display(), destination.display());
        Ok(bytes)
    }
}

impl Default for FileCopier {
    fn default() -> Self {
        Self::new(true)
    }
}
