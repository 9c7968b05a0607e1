//! Run orchestration: validate roots, plan, execute, clean up

use crate::janitor::{CleanupReport, Janitor};
use crate::manifest::normalize_lexically;
use crate::planner::{display_relative, Plan, SyncPlanner};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tunemirror_engine::{ShutdownLevel, ShutdownSignal, WorkerPool};
use tunemirror_media::FileCopier;
use tunemirror_rules::RuleBook;
use tunemirror_types::{
    Error, Job, JobAction, MediaProbe, RenameLimit, Result, SyncStats, ThreadCount, Transcoder,
    DEFAULT_POOL_TICK,
};

/// Synchronization request
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Source directory, playlist or cue sheet
    pub source: PathBuf,
    /// Mirror directory
    pub target: PathBuf,
    /// Request ID for tracking
    pub request_id: uuid::Uuid,
}

impl SyncRequest {
    /// Create a new sync request
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(source: P, target: Q) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            target: target.as_ref().to_path_buf(),
            request_id: uuid::Uuid::new_v4(),
        }
    }
}

/// Synchronization options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Concurrent encoders
    pub threads: ThreadCount,
    /// Plan and report without touching the target
    pub dry_run: bool,
    /// Copy modification times onto copied files
    pub preserve_timestamps: bool,
    /// Candidates tried when renaming a colliding target
    pub rename_limit: RenameLimit,
    /// Directory relative roots are resolved against (current directory if unset)
    pub base_dir: Option<PathBuf>,
    /// Worker pool coordinator tick
    pub pool_tick: Duration,
}

impl SyncOptions {
    /// Options for a dry run
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Set the encoder count
    pub fn with_threads(mut self, threads: ThreadCount) -> Self {
        self.threads = threads;
        self
    }

    /// Resolve relative roots against `base_dir`
    pub fn with_base_dir<P: Into<PathBuf>>(mut self, base_dir: P) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            threads: ThreadCount::default(),
            dry_run: false,
            preserve_timestamps: true,
            rename_limit: RenameLimit::default(),
            base_dir: None,
            pool_tick: DEFAULT_POOL_TICK,
        }
    }
}

/// A file-level failure in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    /// File the failure belongs to
    pub path: PathBuf,
    /// Error message
    pub message: String,
}

/// Outcome of one run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Request ID
    pub request_id: uuid::Uuid,
    /// Resolved source
    pub source: PathBuf,
    /// Resolved target
    pub target: PathBuf,
    /// Counters
    pub stats: SyncStats,
    /// Every planned job
    pub jobs: Vec<Job>,
    /// Janitor results
    pub cleanup: CleanupReport,
    /// Per-file failures from planning and execution
    pub errors: Vec<FileError>,
    /// Whether the run was stopped or killed
    pub cancelled: bool,
    /// Whether this was a dry run
    pub dry_run: bool,
}

impl SyncReport {
    fn new(request_id: uuid::Uuid, source: PathBuf, target: PathBuf, dry_run: bool) -> Self {
        Self {
            request_id,
            source,
            target,
            stats: SyncStats::new(),
            jobs: Vec::new(),
            cleanup: CleanupReport::default(),
            errors: Vec::new(),
            cancelled: false,
            dry_run,
        }
    }

    /// Whether the run finished without failures
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.stats.errors == 0
    }
}

/// Main synchronization engine
pub struct SyncEngine {
    rules: Arc<RuleBook>,
    probe: Arc<dyn MediaProbe>,
    transcoder: Arc<dyn Transcoder>,
    copier: FileCopier,
    options: SyncOptions,
    shutdown: ShutdownSignal,
}

impl SyncEngine {
    /// Create an engine; the rule book is frozen from here on
    pub fn new(
        rules: RuleBook,
        probe: Arc<dyn MediaProbe>,
        transcoder: Arc<dyn Transcoder>,
        options: SyncOptions,
    ) -> Self {
        Self {
            rules: Arc::new(rules),
            probe,
            transcoder,
            copier: FileCopier::new(options.preserve_timestamps),
            options,
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Handle for stopping a run from elsewhere (a signal handler)
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Engine options
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Rules in effect
    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    /// Mirror `request.source` into `request.target`
    ///
    /// Configuration problems (missing source, overlapping roots) fail the call before
    /// anything is written. Per-file failures are counted in the report instead.
    pub async fn sync(&self, request: SyncRequest) -> Result<SyncReport> {
        let start_time = Instant::now();
        let (source, target) = self.resolve_roots(&request).await?;
        info!(
            "Starting sync: {} -> {}{}",
            source.display(),
            target.display(),
            if self.options.dry_run { " (dry run)" } else { "" }
        );

        let planner = SyncPlanner::new(
            Arc::clone(&self.rules),
            Arc::clone(&self.probe),
            self.options.rename_limit,
        );
        let Plan {
            jobs,
            keep,
            checked,
            skipped,
            kept,
            errors,
        } = {
            let source = source.clone();
            let target = target.clone();
            tokio::task::spawn_blocking(move || planner.plan(&source, &target))
                .await
                .map_err(|e| Error::other(format!("Planning task failed: {}", e)))??
        };

        let mut report = SyncReport::new(
            request.request_id,
            source,
            target.clone(),
            self.options.dry_run,
        );
        report.stats.files_checked = checked;
        report.stats.files_skipped = skipped;
        report.stats.files_kept = kept;
        report.stats.errors = errors.len() as u64;
        report.errors = errors
            .into_iter()
            .map(|e| FileError {
                path: e.path,
                message: e.error.to_string(),
            })
            .collect();

        if self.shutdown.is_triggered() {
            report.cancelled = true;
        } else if self.options.dry_run {
            for job in &jobs {
                info!(
                    "would {} {}",
                    job.action,
                    display_relative(&target, &job.target)
                );
            }
        } else {
            self.execute(&jobs, &target, &mut report).await;
        }

        if report.cancelled {
            info!("Sync cancelled; stale files were left in place");
        } else if target.is_dir() {
            let janitor = Janitor::new(
                Arc::clone(&self.rules),
                Arc::clone(&self.probe),
                self.options.dry_run,
            );
            let root = target.clone();
            let cleanup = tokio::task::spawn_blocking(move || janitor.clean(&root, &keep))
                .await
                .map_err(|e| Error::other(format!("Cleanup task failed: {}", e)))?;

            report.stats.files_removed = cleanup.removed_files.len() as u64;
            report.stats.directories_pruned = cleanup.pruned_directories.len() as u64;
            report.stats.errors += cleanup.failures.len() as u64;
            report.cleanup = cleanup;
        }

        report.jobs = jobs;
        report.stats.duration = start_time.elapsed();
        info!(
            "Sync completed: {} checked, {} copied, {} encoded, {} removed, {} error(s) in {:?}",
            report.stats.files_checked,
            report.stats.files_copied,
            report.stats.files_transcoded,
            report.stats.files_removed,
            report.stats.errors,
            report.stats.duration
        );
        Ok(report)
    }

    /// Run jobs on a single-worker copy pool and a `threads`-worker encode pool
    async fn execute(&self, jobs: &[Job], target: &Path, report: &mut SyncReport) {
        let copy_pool = Arc::new(WorkerPool::with_tick("copy", 1, self.options.pool_tick));
        let encode_pool = Arc::new(WorkerPool::with_tick(
            "encode",
            self.options.threads.get(),
            self.options.pool_tick,
        ));
        let watcher = self.forward_shutdown(vec![Arc::clone(&copy_pool), Arc::clone(&encode_pool)]);

        let copy_total = jobs.iter().filter(|j| j.action == JobAction::Copy).count();
        let encode_total = jobs
            .iter()
            .filter(|j| j.action == JobAction::Transcode)
            .count();
        let failures: Arc<Mutex<Vec<FileError>>> = Arc::default();

        for job in jobs {
            let label = display_relative(target, &job.target);
            let failures = Arc::clone(&failures);
            let job = job.clone();

            let submitted = match job.action {
                JobAction::Copy => {
                    let copier = self.copier.clone();
                    copy_pool.submit(async move {
                        info!("copy [{}/{}] {}", job.sequence, copy_total, label);
                        let result = copier.copy(&job.source, &job.target).await.map(|_| ());
                        record_failure(&failures, &job, result)
                    })
                }
                JobAction::Transcode => {
                    let transcoder = Arc::clone(&self.transcoder);
                    encode_pool.submit(async move {
                        info!("encode [{}/{}] {}", job.sequence, encode_total, label);
                        let result = transcoder
                            .encode(
                                &job.source,
                                &job.target,
                                &job.encode_options,
                                &job.effect_options,
                            )
                            .await;
                        record_failure(&failures, &job, result)
                    })
                }
            };

            if let Err(e) = submitted {
                debug!("No further jobs dispatched: {}", e);
                report.cancelled = true;
                break;
            }
        }

        tokio::join!(copy_pool.join(), encode_pool.join());
        watcher.abort();

        report.stats.files_copied = copy_pool.completed();
        report.stats.files_transcoded = encode_pool.completed();
        report.stats.errors += copy_pool.failed() + encode_pool.failed();
        report
            .errors
            .append(&mut failures.lock().unwrap_or_else(PoisonError::into_inner));
        report.cancelled |= self.shutdown.is_triggered();
    }

    /// Relay shutdown requests to the pools of the current run
    fn forward_shutdown(&self, pools: Vec<Arc<WorkerPool>>) -> JoinHandle<()> {
        let mut levels = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                let level = *levels.borrow_and_update();
                match level {
                    ShutdownLevel::Running => {}
                    ShutdownLevel::Stop => pools.iter().for_each(|pool| pool.request_stop()),
                    ShutdownLevel::Kill => {
                        pools.iter().for_each(|pool| pool.request_kill());
                        break;
                    }
                }
                if levels.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Make roots absolute and reject layouts that would mirror a tree into itself
    async fn resolve_roots(&self, request: &SyncRequest) -> Result<(PathBuf, PathBuf)> {
        let base_dir = match &self.options.base_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let base_dir = fs::canonicalize(&base_dir).await.unwrap_or(base_dir);

        let source = normalize_lexically(&base_dir.join(&request.source));
        if !source.exists() {
            return Err(Error::FileNotFound { path: source });
        }
        let source = fs::canonicalize(&source).await?;

        let target = normalize_lexically(&base_dir.join(&request.target));
        let target = if target.exists() {
            fs::canonicalize(&target).await?
        } else {
            target
        };

        let source_root = if source.is_file() {
            source.parent().map_or_else(|| source.clone(), Path::to_path_buf)
        } else {
            source.clone()
        };

        if source_root == target {
            return Err(Error::config(format!(
                "source and target are the same directory: {}",
                target.display()
            )));
        }
        if target.starts_with(&source_root) || source_root.starts_with(&target) {
            return Err(Error::config(format!(
                "source '{}' and target '{}' must not contain each other",
                source_root.display(),
                target.display()
            )));
        }

        if self.options.dry_run {
            return Ok((source, target));
        }

        fs::create_dir_all(&target).await.map_err(|e| Error::Io {
            message: format!("Failed to create directory '{}': {}", target.display(), e),
        })?;
        let target = fs::canonicalize(&target).await?;
        Ok((source, target))
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("transcoder", &self.transcoder.name())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn record_failure(failures: &Mutex<Vec<FileError>>, job: &Job, result: Result<()>) -> Result<()> {
    if let Err(e) = &result {
        warn!("{} failed for {}: {}", job.action, job.source.display(), e);
        failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FileError {
                path: job.source.clone(),
                message: e.to_string(),
            });
    }
    result
}
