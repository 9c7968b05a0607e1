//! Test fixtures: a temp directory of files and a probe keyed by extension

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tunemirror_media::MediaDescriptor;
use tunemirror_types::{MediaKind, MediaProbe, Result};

#[derive(Default)]
pub struct ExtensionProbe {
    calls: AtomicUsize,
}

impl MediaProbe for ExtensionProbe {
    fn kind(&self, path: &Path) -> Result<MediaKind> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match path.extension().and_then(|ext| ext.to_str()) {
            Some("mp3") => MediaKind::audio("mp3"),
            Some("flac") => MediaKind::audio("flac"),
            Some("ogg") => MediaKind::audio("ogg"),
            Some("wav") => MediaKind::audio("wav"),
            _ => MediaKind::NotAudio,
        })
    }

    fn bitrate_kbps(&self, path: &Path) -> Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match path.extension().and_then(|ext| ext.to_str()) {
            Some("mp3") => 128.0,
            Some("ogg") => 160.0,
            Some("flac") => 900.0,
            Some("wav") => 1411.0,
            _ => 0.0,
        })
    }

    fn duration_seconds(&self, _path: &Path) -> Result<f64> {
        Ok(60.0)
    }

    fn encoding(&self, _path: &Path) -> Result<Option<String>> {
        Ok(None)
    }
}

pub struct Library {
    dir: TempDir,
    probe: Arc<ExtensionProbe>,
}

impl Library {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            probe: Arc::new(ExtensionProbe::default()),
        }
    }

    pub fn file(&self, relative: &str) -> MediaDescriptor {
        let path = self.dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"data").unwrap();
        MediaDescriptor::open(path, self.probe.clone()).unwrap()
    }

    pub fn probe_calls(&self) -> usize {
        self.probe.calls.load(Ordering::SeqCst)
    }
}
