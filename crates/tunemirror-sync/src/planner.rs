//! Turning a source tree and a rule book into jobs
//!
//! Planning is synchronous and single-threaded: it probes files, so it runs on a
//! blocking thread. Nothing in the target tree is modified here.

use crate::manifest::{normalize_lexically, Manifest};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tunemirror_media::{extension_of, MediaDescriptor};
use tunemirror_rules::{ClobberAction, EncodeAction, PathAction, RuleBook};
use tunemirror_types::{Error, Job, MediaProbe, RenameLimit, Result};
use walkdir::WalkDir;

/// A per-file failure that did not stop planning
#[derive(Debug)]
pub struct PlanError {
    /// File the error belongs to
    pub path: PathBuf,
    /// What went wrong
    pub error: Error,
}

/// Output of a planning pass
#[derive(Debug, Default)]
pub struct Plan {
    /// Jobs in source order
    pub jobs: Vec<Job>,
    /// Target paths the janitor must not delete
    pub keep: HashSet<PathBuf>,
    /// Source files examined
    pub checked: u64,
    /// Source files whose encode rule said skip
    pub skipped: u64,
    /// Existing targets left alone by the clobber rules
    pub kept: u64,
    /// Per-file errors
    pub errors: Vec<PlanError>,
}

#[derive(Default)]
struct Sequences {
    copy: u64,
    transcode: u64,
}

/// Resolves rules per source file and computes targets
#[derive(Clone)]
pub struct SyncPlanner {
    rules: Arc<RuleBook>,
    probe: Arc<dyn MediaProbe>,
    rename_limit: RenameLimit,
}

impl SyncPlanner {
    /// Create a planner
    pub fn new(rules: Arc<RuleBook>, probe: Arc<dyn MediaProbe>, rename_limit: RenameLimit) -> Self {
        Self {
            rules,
            probe,
            rename_limit,
        }
    }

    /// Plan the mirror of `source` (a directory or a manifest) into `target`
    ///
    /// Both paths should be absolute and normalized; the keep set uses them verbatim.
    pub fn plan(&self, source: &Path, target: &Path) -> Result<Plan> {
        let mut plan = Plan::default();
        let (root, files) = self.collect_inputs(source, &mut plan)?;
        let total = files.len();
        let mut sequences = Sequences::default();

        for (index, path) in files.into_iter().enumerate() {
            info!(
                "check [{}/{}] {}",
                index + 1,
                total,
                display_relative(&root, &path)
            );
            plan.checked += 1;

            if let Err(error) = self.plan_file(&path, &root, target, &mut plan, &mut sequences) {
                warn!("Skipping {}: {}", path.display(), error);
                plan.errors.push(PlanError { path, error });
            }
        }

        debug!(
            "Planned {} job(s), {} kept target(s), {} error(s)",
            plan.jobs.len(),
            plan.kept,
            plan.errors.len()
        );
        Ok(plan)
    }

    fn collect_inputs(&self, source: &Path, plan: &mut Plan) -> Result<(PathBuf, Vec<PathBuf>)> {
        if source.is_file() {
            let manifest = Manifest::read(source)?;
            info!(
                "Reading {} file(s) from manifest {}",
                manifest.entries.len(),
                source.display()
            );
            return Ok((manifest.root, manifest.entries));
        }

        if !source.is_dir() {
            return Err(Error::FileNotFound {
                path: source.to_path_buf(),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(source).sort_by_file_name() {
            match entry {
                Ok(entry) if !entry.file_type().is_dir() && entry.path().is_file() => {
                    files.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| source.to_path_buf(), Path::to_path_buf);
                    warn!("Cannot read {}: {}", path.display(), e);
                    plan.errors.push(PlanError {
                        path,
                        error: Error::io(e.to_string()),
                    });
                }
            }
        }
        Ok((source.to_path_buf(), files))
    }

    fn plan_file(
        &self,
        path: &Path,
        root: &Path,
        target_root: &Path,
        plan: &mut Plan,
        sequences: &mut Sequences,
    ) -> Result<()> {
        let file = MediaDescriptor::open(path, Arc::clone(&self.probe))?;

        let encoding = match self.rules.encode_rules().resolve(&file) {
            Some(EncodeAction::Skip) | None => {
                debug!("skip {}", path.display());
                plan.skipped += 1;
                return Ok(());
            }
            Some(action) => action,
        };

        let path_action = self
            .rules
            .path_rules()
            .resolve(&file)
            .unwrap_or_default();
        let source_extension = file.extension();
        let mut target = target_path(
            path,
            root,
            target_root,
            path_action,
            &encoding.target_extension(&source_extension),
        )?;

        if target.exists() || plan.keep.contains(&target) {
            plan.keep.insert(target.clone());
            let clobber = self
                .rules
                .clobber_rules()
                .resolve(&file)
                .unwrap_or(ClobberAction::Keep);
            debug!("{} exists, clobber rule: {:?}", target.display(), clobber);

            match clobber {
                ClobberAction::Keep => {
                    plan.kept += 1;
                    return Ok(());
                }
                ClobberAction::Overwrite => {}
                ClobberAction::Suffix(suffix) => {
                    target = insert_before_extension(&target, &suffix);
                }
                ClobberAction::Rename => {
                    target = self.free_name(&target, &mut plan.keep)?;
                }
            }
        }
        plan.keep.insert(target.clone());

        let copy = match &encoding {
            EncodeAction::Copy => true,
            EncodeAction::Reencode => false,
            other => extension_of(&target) == source_extension && other.quality().is_none(),
        };

        let job = if copy {
            sequences.copy += 1;
            Job::copy(path.to_path_buf(), target, sequences.copy)
        } else {
            let mut options = self
                .rules
                .option_rules()
                .resolve(&file)
                .unwrap_or_default();
            if let Some(quality) = encoding.quality() {
                options = format!("-C {} {}", quality, options);
            }
            let effect_options = self
                .rules
                .effect_option_rules()
                .resolve(&file)
                .unwrap_or_default();
            sequences.transcode += 1;
            Job::transcode(
                path.to_path_buf(),
                target,
                options,
                effect_options,
                sequences.transcode,
            )
        };

        debug!("{} {} -> {}", job.action, path.display(), job.target.display());
        plan.jobs.push(job);
        Ok(())
    }

    /// First ` (n)` variant of `target` that is neither on disk nor already claimed
    ///
    /// Every candidate tried is claimed so the janitor keeps earlier renames.
    fn free_name(&self, target: &Path, keep: &mut HashSet<PathBuf>) -> Result<PathBuf> {
        let attempts = self.rename_limit.get();
        for n in 1..=attempts {
            let candidate = insert_before_extension(target, &format!(" ({})", n));
            let taken = candidate.exists() || keep.contains(&candidate);
            keep.insert(candidate.clone());
            if !taken {
                return Ok(candidate);
            }
        }
        Err(Error::Collision {
            path: target.to_path_buf(),
            attempts,
        })
    }
}

impl std::fmt::Debug for SyncPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncPlanner")
            .field("rules", &self.rules)
            .field("rename_limit", &self.rename_limit)
            .finish_non_exhaustive()
    }
}

/// Target path for `path` under `target_root`, with `extension` (may be empty)
pub fn target_path(
    path: &Path,
    root: &Path,
    target_root: &Path,
    action: PathAction,
    extension: &str,
) -> Result<PathBuf> {
    let PathAction::PreserveRelative = action;

    let relative = normalize_lexically(path)
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .map_err(|_| {
            Error::other(format!(
                "'{}' is outside the source root '{}'",
                path.display(),
                root.display()
            ))
        })?;

    let mut stem = OsString::from(target_root.join(relative).with_extension(""));
    stem.push(extension);
    Ok(PathBuf::from(stem))
}

/// Insert `text` between the file stem and the extension
pub fn insert_before_extension(path: &Path, text: &str) -> PathBuf {
    let extension = extension_of(path);
    let mut name = OsString::from(path.with_extension(""));
    name.push(text);
    name.push(extension);
    PathBuf::from(name)
}

/// `root-name/relative/path` for progress lines
pub fn display_relative(root: &Path, path: &Path) -> String {
    let root_name = root
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let relative = path.strip_prefix(root).unwrap_or(path);
    if root_name.is_empty() {
        relative.display().to_string()
    } else {
        format!("{}/{}", root_name, relative.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{touch, FakeProbe};
    use rstest::rstest;
    use tempfile::TempDir;
    use tunemirror_rules::Selector;
    use tunemirror_types::JobAction;

    struct Fixture {
        _dir: TempDir,
        source: PathBuf,
        target: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let source = dir.path().join("music");
            let target = dir.path().join("mirror");
            std::fs::create_dir_all(&source).unwrap();
            std::fs::create_dir_all(&target).unwrap();
            Self {
                _dir: dir,
                source,
                target,
            }
        }

        fn plan(&self, rules: RuleBook) -> Plan {
            SyncPlanner::new(Arc::new(rules), Arc::new(FakeProbe), RenameLimit::default())
                .plan(&self.source, &self.target)
                .unwrap()
        }
    }

    #[rstest]
    #[case("a/b.flac", ".ogg", "a/b.ogg")]
    #[case("a/b.flac", ".flac", "a/b.flac")]
    #[case("a/README", "", "a/README")]
    #[case("a/README", ".mp3", "a/README.mp3")]
    #[case("a/b.c.flac", ".ogg", "a/b.c.ogg")]
    fn test_target_path(#[case] relative: &str, #[case] extension: &str, #[case] expected: &str) {
        let root = Path::new("/music");
        let target = target_path(
            &root.join(relative),
            root,
            Path::new("/mirror"),
            PathAction::PreserveRelative,
            extension,
        )
        .unwrap();
        assert_eq!(target, Path::new("/mirror").join(expected));
    }

    #[test]
    fn test_target_path_outside_root() {
        let result = target_path(
            Path::new("/music/../elsewhere/a.flac"),
            Path::new("/music"),
            Path::new("/mirror"),
            PathAction::PreserveRelative,
            ".flac",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_insert_before_extension() {
        assert_eq!(
            insert_before_extension(Path::new("/m/a.mp3"), " (1)"),
            PathBuf::from("/m/a (1).mp3")
        );
        assert_eq!(
            insert_before_extension(Path::new("/m/notes"), "-new"),
            PathBuf::from("/m/notes-new")
        );
    }

    #[test]
    fn test_lossy_skip_and_copy() {
        let fixture = Fixture::new();
        touch(&fixture.source.join("a.flac"));
        touch(&fixture.source.join("b.mp3"));

        let mut rules = RuleBook::new();
        rules.skip(Selector::lossy().with_min_bitrate(96.0)).unwrap();
        let plan = fixture.plan(rules);

        assert_eq!(plan.checked, 2);
        assert_eq!(plan.skipped, 1);
        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.jobs[0].action, JobAction::Copy);
        assert_eq!(plan.jobs[0].target, fixture.target.join("a.flac"));
        assert!(plan.keep.contains(&fixture.target.join("a.flac")));
    }

    #[test]
    fn test_conversion_builds_options() {
        let fixture = Fixture::new();
        touch(&fixture.source.join("album/a.flac"));
        touch(&fixture.source.join("album/b.flac"));

        let mut rules = RuleBook::new();
        rules
            .encode(
                Selector::lossless(),
                EncodeAction::convert_with_quality(Some("ogg"), 6.0),
            )
            .unwrap()
            .effect_options(Selector::lossless(), "rate 44100")
            .unwrap();
        let plan = fixture.plan(rules);

        assert_eq!(plan.jobs.len(), 2);
        let job = &plan.jobs[1];
        assert_eq!(job.action, JobAction::Transcode);
        assert_eq!(job.sequence, 2);
        assert_eq!(job.target, fixture.target.join("album/b.ogg"));
        assert_eq!(job.encode_options, "-C 6 ");
        assert_eq!(job.effect_options, "rate 44100");
    }

    #[test]
    fn test_same_extension_without_quality_is_a_copy() {
        let fixture = Fixture::new();
        touch(&fixture.source.join("a.mp3"));
        touch(&fixture.source.join("b.ogg"));

        let mut rules = RuleBook::new();
        rules
            .encode(Selector::codec("mp3"), EncodeAction::convert_to("mp3"))
            .unwrap()
            .encode(Selector::codec("vorbis"), EncodeAction::Reencode)
            .unwrap();
        let plan = fixture.plan(rules);

        assert_eq!(plan.jobs[0].action, JobAction::Copy);
        assert_eq!(plan.jobs[1].action, JobAction::Transcode);
        assert_eq!(plan.jobs[1].target, fixture.target.join("b.ogg"));
    }

    #[test]
    fn test_keep_existing_target() {
        let fixture = Fixture::new();
        touch(&fixture.source.join("a.mp3"));
        touch(&fixture.target.join("a.mp3"));

        let mut rules = RuleBook::new();
        rules
            .clobber(Selector::everything(), ClobberAction::Keep)
            .unwrap();
        let plan = fixture.plan(rules);

        assert!(plan.jobs.is_empty());
        assert_eq!(plan.kept, 1);
        assert!(plan.keep.contains(&fixture.target.join("a.mp3")));
    }

    #[test]
    fn test_existing_target_kept_without_clobber_rule() {
        let fixture = Fixture::new();
        touch(&fixture.source.join("a.mp3"));
        touch(&fixture.source.join("b.mp3"));
        touch(&fixture.target.join("a.mp3"));

        let plan = fixture.plan(RuleBook::new());

        assert_eq!(plan.kept, 1);
        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.jobs[0].target, fixture.target.join("b.mp3"));
        assert_eq!(plan.jobs[0].sequence, 1);
        assert!(plan.keep.contains(&fixture.target.join("a.mp3")));
    }

    #[test]
    fn test_rename_skips_taken_names() {
        let fixture = Fixture::new();
        touch(&fixture.source.join("a.mp3"));
        touch(&fixture.target.join("a.mp3"));
        touch(&fixture.target.join("a (1).mp3"));

        let mut rules = RuleBook::new();
        rules
            .clobber(Selector::everything(), ClobberAction::Rename)
            .unwrap();
        let plan = fixture.plan(rules);

        assert_eq!(plan.jobs[0].target, fixture.target.join("a (2).mp3"));
        for name in ["a.mp3", "a (1).mp3", "a (2).mp3"] {
            assert!(plan.keep.contains(&fixture.target.join(name)), "{}", name);
        }
    }

    #[test]
    fn test_rename_avoids_names_claimed_in_this_run() {
        let fixture = Fixture::new();
        // both map to "a.ogg"
        touch(&fixture.source.join("a.flac"));
        touch(&fixture.source.join("a.wav"));

        let mut rules = RuleBook::new();
        rules
            .encode(Selector::lossless(), EncodeAction::convert_to("ogg"))
            .unwrap()
            .clobber(Selector::everything(), ClobberAction::Rename)
            .unwrap();
        let plan = fixture.plan(rules);

        let targets: Vec<_> = plan.jobs.iter().map(|job| job.target.clone()).collect();
        assert_eq!(
            targets,
            vec![fixture.target.join("a.ogg"), fixture.target.join("a (1).ogg")]
        );
    }

    #[test]
    fn test_suffix() {
        let fixture = Fixture::new();
        touch(&fixture.source.join("a.mp3"));
        touch(&fixture.target.join("a.mp3"));

        let mut rules = RuleBook::new();
        rules
            .clobber(Selector::everything(), ClobberAction::Suffix("-new".into()))
            .unwrap();
        let plan = fixture.plan(rules);

        assert_eq!(plan.jobs[0].target, fixture.target.join("a-new.mp3"));
        assert_eq!(plan.jobs[0].action, JobAction::Copy);
    }

    #[test]
    fn test_rename_limit_exhaustion_is_per_file() {
        let fixture = Fixture::new();
        touch(&fixture.source.join("a.mp3"));
        touch(&fixture.source.join("b.mp3"));
        touch(&fixture.target.join("a.mp3"));
        touch(&fixture.target.join("a (1).mp3"));

        let mut rules = RuleBook::new();
        rules
            .clobber(Selector::everything(), ClobberAction::Rename)
            .unwrap();
        let plan = SyncPlanner::new(
            Arc::new(rules),
            Arc::new(FakeProbe),
            RenameLimit::new(1).unwrap(),
        )
        .plan(&fixture.source, &fixture.target)
        .unwrap();

        assert_eq!(plan.errors.len(), 1);
        assert!(matches!(plan.errors[0].error, Error::Collision { attempts: 1, .. }));
        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.jobs[0].target, fixture.target.join("b.mp3"));
    }

    #[test]
    fn test_manifest_source() {
        let fixture = Fixture::new();
        touch(&fixture.source.join("x/a.flac"));
        touch(&fixture.source.join("x/b.flac"));
        let playlist = fixture.source.join("best.m3u");
        std::fs::write(&playlist, "# best of\nx/b.flac\n../outside.flac\n").unwrap();
        touch(&fixture.source.parent().unwrap().join("outside.flac"));

        let plan = SyncPlanner::new(
            Arc::new(RuleBook::new()),
            Arc::new(FakeProbe),
            RenameLimit::default(),
        )
        .plan(&playlist, &fixture.target)
        .unwrap();

        assert_eq!(plan.checked, 2);
        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.jobs[0].target, fixture.target.join("x/b.flac"));
        assert_eq!(plan.errors.len(), 1);
    }

    #[test]
    fn test_display_relative() {
        assert_eq!(
            display_relative(Path::new("/home/me/music"), Path::new("/home/me/music/a/b.flac")),
            "music/a/b.flac"
        );
    }
}
