//! Fixtures and fakes for end-to-end runs

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::TempDir;
use tokio::sync::{mpsc, Semaphore};
use tunemirror_rules::RuleBook;
use tunemirror_sync::{SyncEngine, SyncOptions, SyncReport, SyncRequest};
use tunemirror_types::{Error, MediaKind, MediaProbe, Result, ThreadCount, Transcoder};

/// A source library and a mirror directory under one temporary directory
pub struct Library {
    dir: TempDir,
}

impl Library {
    /// Create an empty library with `music/` as source and `mirror/` as target
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("music")).expect("Failed to create source");
        Self { dir }
    }

    /// Base directory
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Source root
    pub fn source(&self) -> PathBuf {
        self.dir.path().join("music")
    }

    /// Target root
    pub fn target(&self) -> PathBuf {
        self.dir.path().join("mirror")
    }

    /// Write a source file; its content names the file
    pub fn add_source(&self, relative: &str) -> PathBuf {
        let path = self.source().join(relative);
        write_file(&path, relative.as_bytes());
        path
    }

    /// Write a target file with the given content
    pub fn add_target(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.target().join(relative);
        write_file(&path, content.as_bytes());
        path
    }

    /// Read a target file
    pub fn read_target(&self, relative: &str) -> String {
        fs::read_to_string(self.target().join(relative)).expect("Failed to read target file")
    }

    /// Whether a target file or directory exists
    pub fn target_exists(&self, relative: &str) -> bool {
        self.target().join(relative).exists()
    }

    /// Sorted relative paths of every file under the target
    pub fn target_files(&self) -> Vec<String> {
        let mut files = Vec::new();
        collect_files(&self.target(), &self.target(), &mut files);
        files.sort();
        files
    }

    /// Engine over this library with the fake prober and two encoders
    pub fn engine(&self, rules: RuleBook, transcoder: Arc<dyn Transcoder>) -> SyncEngine {
        let options =
            SyncOptions::default().with_threads(ThreadCount::new(2).expect("valid thread count"));
        self.engine_with(rules, transcoder, options)
    }

    /// Engine with explicit options; relative roots resolve against the library
    pub fn engine_with(
        &self,
        rules: RuleBook,
        transcoder: Arc<dyn Transcoder>,
        options: SyncOptions,
    ) -> SyncEngine {
        let options = options.with_base_dir(self.root());
        SyncEngine::new(rules, Arc::new(ExtensionProbe), transcoder, options)
    }

    /// Mirror `music/` into `mirror/`
    pub async fn sync(&self, engine: &SyncEngine) -> SyncReport {
        engine
            .sync(SyncRequest::new("music", "mirror"))
            .await
            .expect("sync failed")
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, files);
        } else if let Ok(relative) = path.strip_prefix(root) {
            files.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
}

/// Write `content` to `path`, creating parent directories
pub fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(path, content).expect("Failed to write test file");
}

/// Prober that decides by extension
///
/// | extension | codec  | kbps |
/// |-----------|--------|------|
/// | mp3       | mp3    | 128  |
/// | ogg       | vorbis | 160  |
/// | flac      | flac   | 900  |
/// | wav       | wav    | 1411 |
pub struct ExtensionProbe;

impl ExtensionProbe {
    fn lookup(path: &Path) -> Option<(&'static str, f64)> {
        match path.extension()?.to_str()? {
            "mp3" => Some(("mp3", 128.0)),
            "ogg" => Some(("ogg", 160.0)),
            "flac" => Some(("flac", 900.0)),
            "wav" => Some(("wav", 1411.0)),
            _ => None,
        }
    }
}

impl MediaProbe for ExtensionProbe {
    fn kind(&self, path: &Path) -> Result<MediaKind> {
        if !path.is_file() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(Self::lookup(path).map_or(MediaKind::NotAudio, |(codec, _)| MediaKind::audio(codec)))
    }

    fn bitrate_kbps(&self, path: &Path) -> Result<f64> {
        Ok(Self::lookup(path).map_or(0.0, |(_, kbps)| kbps))
    }

    fn duration_seconds(&self, _path: &Path) -> Result<f64> {
        Ok(180.0)
    }

    fn encoding(&self, _path: &Path) -> Result<Option<String>> {
        Ok(None)
    }
}

/// One recorded encoder invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeCall {
    /// Input file
    pub input: PathBuf,
    /// Output file
    pub output: PathBuf,
    /// Encoder options
    pub options: String,
    /// Effect options
    pub effect_options: String,
}

/// Transcoder that writes a description of the call as the output
///
/// Inputs whose file name contains `broken` fail with an encode error.
#[derive(Default)]
pub struct RecordingTranscoder {
    calls: Mutex<Vec<EncodeCall>>,
}

impl RecordingTranscoder {
    /// Create a transcoder
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Calls so far, sorted by input path
    pub fn calls(&self) -> Vec<EncodeCall> {
        let mut calls = self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        calls.sort_by(|a, b| a.input.cmp(&b.input));
        calls
    }
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
        let name = input.file_name().map(|n| n.to_string_lossy().into_owned());
        if name.as_deref().is_some_and(|n| n.contains("broken")) {
            return Err(Error::encode(input, "unsupported input"));
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, format!("encoded {} {}", options, effect_options)).await?;

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(EncodeCall {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                options: options.to_string(),
                effect_options: effect_options.to_string(),
            });
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Transcoder that reports each start and then waits for a permit
pub struct GatedTranscoder {
    gate: Semaphore,
    started: mpsc::UnboundedSender<PathBuf>,
}

impl GatedTranscoder {
    /// Create a closed gate and the receiver of start notifications
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PathBuf>) {
        let (started, receiver) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                gate: Semaphore::new(0),
                started,
            }),
            receiver,
        )
    }

    /// Let `count` waiting encodes finish
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }
}

#[async_trait]
impl Transcoder for GatedTranscoder {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        _options: &str,
        _effect_options: &str,
    ) -> Result<()> {
        let _ = self.started.send(input.to_path_buf());
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| Error::other(e.to_string()))?;
        permit.forget();

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, b"encoded").await?;
        Ok(())
    }
}
