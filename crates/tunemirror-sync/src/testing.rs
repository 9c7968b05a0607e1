//! Test doubles: a probe keyed by extension and a transcoder that copies bytes

use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use tunemirror_types::{Error, MediaKind, MediaProbe, Result, Transcoder};

pub fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, path.to_string_lossy().as_bytes()).unwrap();
}

pub struct FakeProbe;

impl MediaProbe for FakeProbe {
    fn kind(&self, path: &Path) -> Result<MediaKind> {
        if !path.is_file() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(match path.extension().and_then(|ext| ext.to_str()) {
            Some("mp3") => MediaKind::audio("mp3"),
            Some("ogg") => MediaKind::audio("ogg"),
            Some("flac") => MediaKind::audio("flac"),
            Some("wav") => MediaKind::audio("wav"),
            _ => MediaKind::NotAudio,
        })
    }

    fn bitrate_kbps(&self, path: &Path) -> Result<f64> {
        Ok(match path.extension().and_then(|ext| ext.to_str()) {
            Some("mp3") => 128.0,
            Some("ogg") => 160.0,
            Some("flac") => 900.0,
            Some("wav") => 1411.0,
            _ => 0.0,
        })
    }

    fn duration_seconds(&self, _path: &Path) -> Result<f64> {
        Ok(1.0)
    }

    fn encoding(&self, _path: &Path) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Writes the input bytes to the output and remembers each call
#[derive(Default)]
pub struct RecordingTranscoder {
    pub calls: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl Transcoder for RecordingTranscoder {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        options: &str,
        effect_options: &str,
    ) -> Result<()> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(input, output).await?;
        self.calls.lock().unwrap().push((
            output.display().to_string(),
            options.to_string(),
            effect_options.to_string(),
        ));
        Ok(())
    }
}
