//! `sox` backed prober and transcoder

use crate::staging::StagingFile;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, trace};
use tunemirror_types::{Error, MediaKind, MediaProbe, Result, Transcoder};

/// Default name of the sox executable
pub const DEFAULT_SOX: &str = "sox";

/// Playlists are never handed to the prober
const UNPROBED_EXTENSIONS: &[&str] = &["m3u"];

/// Prober that shells out to `sox --info`
#[derive(Debug, Clone)]
pub struct SoxProbe {
    sox_path: PathBuf,
}

impl SoxProbe {
    /// Create a prober using the given sox executable
    pub fn new<P: Into<PathBuf>>(sox_path: P) -> Self {
        Self {
            sox_path: sox_path.into(),
        }
    }

    /// Run `sox --info -V0 <flag> <path>` and return the first output line
    ///
    /// `Ok(None)` means sox ran but did not recognize the file.
    fn info(&self, path: &Path, flag: &str) -> Result<Option<String>> {
        if !path.is_file() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        if path
            .extension()
            .is_some_and(|ext| UNPROBED_EXTENSIONS.iter().any(|skip| ext.eq_ignore_ascii_case(skip)))
        {
            return Ok(None);
        }

        trace!("sox --info {} {}", flag, path.display());
        let output = Command::new(&self.sox_path)
            .args(["--info", "-V0", flag])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                Error::probe(
                    path,
                    format!("failed to run '{}': {}", self.sox_path.display(), e),
                )
            })?;

        if !output.status.success() {
            return Ok(None);
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty()))
    }
}

impl Default for SoxProbe {
    fn default() -> Self {
        Self::new(DEFAULT_SOX)
    }
}

impl MediaProbe for SoxProbe {
    fn kind(&self, path: &Path) -> Result<MediaKind> {
        Ok(self
            .info(path, "-t")?
            .map_or(MediaKind::NotAudio, |codec| MediaKind::audio(&codec)))
    }

    fn bitrate_kbps(&self, path: &Path) -> Result<f64> {
        Ok(self
            .info(path, "-B")?
            .map_or(0.0, |text| parse_bitrate_kbps(&text)))
    }

    fn duration_seconds(&self, path: &Path) -> Result<f64> {
        Ok(self
            .info(path, "-D")?
            .and_then(|text| text.parse().ok())
            .unwrap_or(0.0))
    }

    fn encoding(&self, path: &Path) -> Result<Option<String>> {
        self.info(path, "-e")
    }
}

/// Convert sox's bitrate text into kbps
///
/// `114k` is 114, `2.82M` is 2820, a bare number is bits per second.
/// Unparseable text yields 0.
pub fn parse_bitrate_kbps(text: &str) -> f64 {
    let text = text.trim();
    let (number, scale) = match text.chars().last() {
        Some('k' | 'K') => (&text[..text.len() - 1], 1.0),
        Some('M') => (&text[..text.len() - 1], 1_000.0),
        Some('G') => (&text[..text.len() - 1], 1_000_000.0),
        _ => (text, 0.001),
    };
    number.trim().parse::<f64>().map_or(0.0, |value| value * scale)
}

/// Transcoder that runs `sox <input> <options> <output> <effects>`
#[derive(Debug, Clone)]
pub struct SoxTranscoder {
    sox_path: PathBuf,
}

impl SoxTranscoder {
    /// Create a transcoder using the given sox executable
    pub fn new<P: Into<PathBuf>>(sox_path: P) -> Self {
        Self {
            sox_path: sox_path.into(),
        }
    }
}

impl Default for SoxTranscoder {
    fn default() -> Self {
        Self::new(DEFAULT_SOX)
    }
}

#[async_trait]
impl Transcoder for SoxTranscoder {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        options: &str,
        effect_options: &str,
    ) -> Result<()> {
        let staging = StagingFile::for_target(output).await?;

        let mut cmd = tokio::process::Command::new(&self.sox_path);
        cmd.arg(input)
            .args(options.split_whitespace())
            .arg(staging.path())
            .args(effect_options.split_whitespace())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(sox_cmd = ?cmd, "starting encoder");

        let result = cmd.output().await.map_err(|e| {
            Error::encode(
                output,
                format!("failed to run '{}': {}", self.sox_path.display(), e),
            )
        })?;

        if !result.status.success() {
            return Err(Error::encode(
                output,
                format!(
                    "sox exited with {}: {}",
                    result.status,
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            ));
        }

        staging.commit().await
    }

    fn name(&self) -> &str {
        "sox"
    }
}
