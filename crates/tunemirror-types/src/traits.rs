//! Collaborator traits for tunemirror
//!
//! The core never decodes audio itself. Everything it needs to know about a file comes
//! through a [`MediaProbe`], and every re-encode goes through a [`Transcoder`]. Both are
//! object safe so the engine can hold them as `Arc<dyn ...>` and tests can swap in fakes.

use crate::{MediaKind, ProbeReport, Result};
use std::path::Path;

#[cfg(feature = "async")]
use async_trait::async_trait;

/// Trait for inspecting media files
///
/// Implementations are synchronous; the planner runs them on a blocking thread.
/// Files the prober does not understand are reported as [`MediaKind::NotAudio`],
/// never as errors. A missing or non-regular path is `FileNotFound`.
pub trait MediaProbe: Send + Sync {
    /// Detect the media kind of a file
    fn kind(&self, path: &Path) -> Result<MediaKind>;

    /// Bitrate in kbps, 0 when unknown
    fn bitrate_kbps(&self, path: &Path) -> Result<f64>;

    /// Duration in seconds, 0 when unknown
    fn duration_seconds(&self, path: &Path) -> Result<f64>;

    /// Sample encoding description, if the prober reports one
    fn encoding(&self, path: &Path) -> Result<Option<String>>;

    /// Probe every field at once
    fn probe(&self, path: &Path) -> Result<ProbeReport> {
        let kind = self.kind(path)?;
        if !kind.is_audio() {
            return Ok(ProbeReport::unrecognized());
        }

        Ok(ProbeReport {
            recognized: true,
            bitrate_kbps: self.bitrate_kbps(path)?,
            duration_seconds: self.duration_seconds(path)?,
            kind,
        })
    }
}

/// Trait for re-encoding audio files
#[cfg(feature = "async")]
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Encode `input` into `output`
    ///
    /// `options` are passed to the encoder before the output path, `effect_options`
    /// after it. Parent directories of `output` are created as needed.
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        options: &str,
        effect_options: &str,
    ) -> Result<()>;

    /// Short name used in log lines
    fn name(&self) -> &str {
        "transcoder"
    }
}
