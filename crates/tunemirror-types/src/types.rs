//! Core data types for tunemirror
//!
//! Media classification as reported by the prober, the job model produced by the
//! planner, and the statistics accumulated over one run.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Codecs treated as lossless by `lossless`/`lossy` rule categories
pub const LOSSLESS_CODECS: &[&str] = &["wav", "flac", "wv", "sox"];

/// Normalize a codec symbol as reported by the prober
///
/// Lower-cases the name and folds `ogg` into `vorbis`.
pub fn normalize_codec(codec: &str) -> String {
    let codec = codec.trim().to_ascii_lowercase();
    if codec == "ogg" {
        "vorbis".to_string()
    } else {
        codec
    }
}

/// Classification of a file by the prober
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MediaKind {
    /// Recognized audio, with its normalized codec symbol
    Audio(String),
    /// Anything the prober does not understand
    NotAudio,
}

impl MediaKind {
    /// Build an audio kind from a raw codec symbol
    pub fn audio(codec: &str) -> Self {
        Self::Audio(normalize_codec(codec))
    }

    /// Whether the prober recognized the file as audio
    pub fn is_audio(&self) -> bool {
        matches!(self, Self::Audio(_))
    }

    /// Codec symbol, if audio
    pub fn codec(&self) -> Option<&str> {
        match self {
            Self::Audio(codec) => Some(codec),
            Self::NotAudio => None,
        }
    }

    /// Whether the file is audio in a lossless codec
    pub fn is_lossless(&self) -> bool {
        self.codec()
            .is_some_and(|codec| LOSSLESS_CODECS.contains(&codec))
    }

    /// Whether the file is audio in a lossy codec
    pub fn is_lossy(&self) -> bool {
        self.is_audio() && !self.is_lossless()
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio(codec) => f.write_str(codec),
            Self::NotAudio => f.write_str("none"),
        }
    }
}

/// Everything the prober reports about one file
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProbeReport {
    /// Whether the file was recognized as audio
    pub recognized: bool,
    /// Media kind
    pub kind: MediaKind,
    /// Bitrate in kbps (0 when unknown)
    pub bitrate_kbps: f64,
    /// Duration in seconds (0 when unknown)
    pub duration_seconds: f64,
}

impl ProbeReport {
    /// Report for a file the prober does not understand
    pub fn unrecognized() -> Self {
        Self {
            recognized: false,
            kind: MediaKind::NotAudio,
            bitrate_kbps: 0.0,
            duration_seconds: 0.0,
        }
    }
}

/// What a job does with its source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JobAction {
    /// Byte-for-byte copy
    Copy,
    /// Re-encode through the transcoder
    Transcode,
}

impl fmt::Display for JobAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => f.write_str("copy"),
            Self::Transcode => f.write_str("encode"),
        }
    }
}

/// One planned filesystem action
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Job {
    /// Source file
    pub source: PathBuf,
    /// Final target path
    pub target: PathBuf,
    /// Action to perform
    pub action: JobAction,
    /// Encoder option string (transcodes only)
    pub encode_options: String,
    /// Effect option string (transcodes only)
    pub effect_options: String,
    /// 1-based sequence number within the job's action class
    pub sequence: u64,
}

impl Job {
    /// Create a copy job
    pub fn copy(source: PathBuf, target: PathBuf, sequence: u64) -> Self {
        Self {
            source,
            target,
            action: JobAction::Copy,
            encode_options: String::new(),
            effect_options: String::new(),
            sequence,
        }
    }

    /// Create a transcode job
    pub fn transcode(
        source: PathBuf,
        target: PathBuf,
        encode_options: String,
        effect_options: String,
        sequence: u64,
    ) -> Self {
        Self {
            source,
            target,
            action: JobAction::Transcode,
            encode_options,
            effect_options,
            sequence,
        }
    }
}

/// Statistics for one synchronization run
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyncStats {
    /// Source files examined
    pub files_checked: u64,
    /// Files whose encode rule said skip
    pub files_skipped: u64,
    /// Existing targets left alone by the clobber rules
    pub files_kept: u64,
    /// Files copied
    pub files_copied: u64,
    /// Files transcoded
    pub files_transcoded: u64,
    /// Planning or execution failures
    pub errors: u64,
    /// Stale target files removed
    pub files_removed: u64,
    /// Empty target directories removed
    pub directories_pruned: u64,
    /// Total duration of the run
    pub duration: Duration,
}

impl SyncStats {
    /// Create a new empty statistics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files written to the target
    pub fn files_written(&self) -> u64 {
        self.files_copied + self.files_transcoded
    }

    /// Merge statistics from another instance
    pub fn merge(&mut self, other: &SyncStats) {
        self.files_checked += other.files_checked;
        self.files_skipped += other.files_skipped;
        self.files_kept += other.files_kept;
        self.files_copied += other.files_copied;
        self.files_transcoded += other.files_transcoded;
        self.errors += other.errors;
        self.files_removed += other.files_removed;
        self.directories_pruned += other.directories_pruned;
        self.duration += other.duration;
    }
}
