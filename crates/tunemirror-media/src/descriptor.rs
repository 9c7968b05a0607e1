//! Lazily probed view over a single media file

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{trace, warn};
use tunemirror_types::{Error, MediaKind, MediaProbe, Result};

/// A file plus memoized answers from the prober
///
/// Each field is probed at most once per descriptor, and only when a caller asks for
/// it. Rules that never look at media properties never start the prober.
pub struct MediaDescriptor {
    path: PathBuf,
    probe: Arc<dyn MediaProbe>,
    kind: OnceLock<MediaKind>,
    bitrate_kbps: OnceLock<f64>,
    duration_seconds: OnceLock<f64>,
    encoding: OnceLock<Option<String>>,
}

impl MediaDescriptor {
    /// Create a descriptor for an existing regular file
    pub fn open<P: Into<PathBuf>>(path: P, probe: Arc<dyn MediaProbe>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(Error::FileNotFound { path });
        }

        Ok(Self {
            path,
            probe,
            kind: OnceLock::new(),
            bitrate_kbps: OnceLock::new(),
            duration_seconds: OnceLock::new(),
            encoding: OnceLock::new(),
        })
    }

    /// Path of the described file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File extension with a leading dot, or an empty string
    pub fn extension(&self) -> String {
        extension_of(&self.path)
    }

    /// Media kind, probed on first use
    pub fn kind(&self) -> &MediaKind {
        self.kind.get_or_init(|| {
            trace!("probing kind of {}", self.path.display());
            self.probe.kind(&self.path).unwrap_or_else(|e| {
                warn!("Treating {} as non-audio: {}", self.path.display(), e);
                MediaKind::NotAudio
            })
        })
    }

    /// Bitrate in kbps, 0 when unknown
    pub fn bitrate_kbps(&self) -> f64 {
        *self.bitrate_kbps.get_or_init(|| {
            if !self.kind().is_audio() {
                return 0.0;
            }
            self.probe.bitrate_kbps(&self.path).unwrap_or_else(|e| {
                warn!("Unknown bitrate for {}: {}", self.path.display(), e);
                0.0
            })
        })
    }

    /// Duration in seconds, 0 when unknown
    pub fn duration_seconds(&self) -> f64 {
        *self.duration_seconds.get_or_init(|| {
            if !self.kind().is_audio() {
                return 0.0;
            }
            self.probe.duration_seconds(&self.path).unwrap_or_else(|e| {
                warn!("Unknown duration for {}: {}", self.path.display(), e);
                0.0
            })
        })
    }

    /// Sample encoding as reported by the prober
    pub fn encoding(&self) -> Option<&str> {
        self.encoding
            .get_or_init(|| {
                if !self.kind().is_audio() {
                    return None;
                }
                self.probe.encoding(&self.path).unwrap_or_else(|e| {
                    warn!("Unknown encoding for {}: {}", self.path.display(), e);
                    None
                })
            })
            .as_deref()
    }

    /// Whether the file is audio
    pub fn is_audio(&self) -> bool {
        self.kind().is_audio()
    }

    /// Whether the file is lossless audio
    pub fn is_lossless(&self) -> bool {
        self.kind().is_lossless()
    }

    /// Whether the file is lossy audio
    pub fn is_lossy(&self) -> bool {
        self.kind().is_lossy()
    }
}

impl fmt::Debug for MediaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaDescriptor")
            .field("path", &self.path)
            .field("kind", &self.kind.get())
            .field("bitrate_kbps", &self.bitrate_kbps.get())
            .finish_non_exhaustive()
    }
}

/// Extension of `path` with a leading dot, or an empty string when it has none
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}
