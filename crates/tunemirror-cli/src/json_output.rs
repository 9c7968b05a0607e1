//! JSON output structures for the tunemirror CLI

use serde::Serialize;
use std::path::{Path, PathBuf};
use tunemirror_media::MediaDescriptor;
use tunemirror_sync::SyncReport;

/// Complete JSON output for a sync run
#[derive(Debug, Serialize)]
pub struct SyncResultJson<'a> {
    /// Operation metadata
    pub metadata: OperationMetadata,
    /// Run report, absent when the run failed before planning
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<&'a SyncReport>,
    /// Overall result
    pub result: OperationResult,
}

/// Operation metadata
#[derive(Debug, Serialize)]
pub struct OperationMetadata {
    /// tunemirror version
    pub version: String,
    /// Operation type
    pub operation: String,
    /// Source path
    pub source_path: String,
    /// Target path
    pub target_path: String,
}

impl OperationMetadata {
    fn sync(source: &Path, target: &Path) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            operation: "sync".to_string(),
            source_path: source.display().to_string(),
            target_path: target.display().to_string(),
        }
    }
}

/// Overall operation result
#[derive(Debug, Serialize)]
pub struct OperationResult {
    /// Whether the run finished without failures
    pub success: bool,
    /// Error message if the run failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Probe output for one file
#[derive(Debug, Serialize)]
pub struct ProbeJson {
    /// Inspected file
    pub path: PathBuf,
    /// Whether the file is audio
    pub audio: bool,
    /// Normalized codec name, "none" for non-audio files
    pub codec: String,
    /// Whether the codec is lossless
    pub lossless: bool,
    /// Bitrate in kbps
    pub bitrate_kbps: f64,
    /// Duration in seconds
    pub duration_seconds: f64,
    /// Sample encoding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl ProbeJson {
    /// Collect every probed field of `file`
    pub fn from_descriptor(file: &MediaDescriptor) -> Self {
        Self {
            path: file.path().to_path_buf(),
            audio: file.is_audio(),
            codec: file.kind().to_string(),
            lossless: file.is_lossless(),
            bitrate_kbps: file.bitrate_kbps(),
            duration_seconds: file.duration_seconds(),
            encoding: file.encoding().map(str::to_string),
        }
    }
}

/// Print a finished run as JSON
pub fn print_report(report: &SyncReport) -> serde_json::Result<()> {
    let output = SyncResultJson {
        metadata: OperationMetadata::sync(&report.source, &report.target),
        report: Some(report),
        result: OperationResult {
            success: report.is_success(),
            error_message: None,
        },
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Print a run that failed before producing a report
pub fn print_failure(source: &Path, target: &Path, message: &str) -> serde_json::Result<()> {
    let output = SyncResultJson {
        metadata: OperationMetadata::sync(source, target),
        report: None,
        result: OperationResult {
            success: false,
            error_message: Some(message.to_string()),
        },
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
