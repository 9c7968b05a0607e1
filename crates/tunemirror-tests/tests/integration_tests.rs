//! Integration tests for tunemirror
//!
//! These tests run whole mirror passes over temporary libraries with a fake prober
//! and fake transcoders.

use std::path::PathBuf;
use std::time::Duration;
use tokio::time::timeout;

use tunemirror_config::RulesConfig;
use tunemirror_rules::{ClobberAction, EncodeAction, RuleBook, Selector};
use tunemirror_sync::{SyncOptions, SyncRequest};
use tunemirror_tests::test_utils::{GatedTranscoder, Library, RecordingTranscoder};
use tunemirror_types::{Error, ThreadCount};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn test_skips_lossy_above_threshold_and_copies_the_rest() {
    init_tracing();
    let library = Library::new();
    library.add_source("a.flac");
    library.add_source("b.mp3");

    let mut rules = RuleBook::new();
    rules.skip(Selector::lossy().with_min_bitrate(96.0)).unwrap();
    let report = library
        .sync(&library.engine(rules, RecordingTranscoder::new()))
        .await;

    assert!(report.is_success());
    assert_eq!(library.target_files(), vec!["a.flac"]);
    assert_eq!(library.read_target("a.flac"), "a.flac");
    assert_eq!(report.stats.files_checked, 2);
    assert_eq!(report.stats.files_skipped, 1);
    assert_eq!(report.stats.files_copied, 1);
}

#[tokio::test]
async fn test_rename_clobber_keeps_existing_target() {
    let library = Library::new();
    library.add_source("a.mp3");
    library.add_target("a.mp3", "already here");

    let mut rules = RuleBook::new();
    rules
        .clobber(Selector::everything(), ClobberAction::Rename)
        .unwrap();
    let report = library
        .sync(&library.engine(rules, RecordingTranscoder::new()))
        .await;

    assert_eq!(library.target_files(), vec!["a (1).mp3", "a.mp3"]);
    assert_eq!(library.read_target("a.mp3"), "already here");
    assert_eq!(library.read_target("a (1).mp3"), "a.mp3");
    assert_eq!(report.stats.files_removed, 0);
}

#[tokio::test]
async fn test_suffix_clobber() {
    let library = Library::new();
    library.add_source("art/cover.jpg");
    library.add_target("art/cover.jpg", "old cover");

    let mut rules = RuleBook::new();
    rules
        .clobber(
            Selector::everything().with_extension("jpg"),
            ClobberAction::Suffix("-new".to_string()),
        )
        .unwrap();
    library
        .sync(&library.engine(rules, RecordingTranscoder::new()))
        .await;

    assert_eq!(
        library.target_files(),
        vec!["art/cover-new.jpg", "art/cover.jpg"]
    );
    assert_eq!(library.read_target("art/cover.jpg"), "old cover");
}

#[tokio::test]
async fn test_removes_stale_files_and_prunes_directories() {
    let library = Library::new();
    library.add_source("keep/a.mp3");
    library.add_target("gone/stale.mp3", "stale");
    library.add_target("keep/notes.keep", "mine");

    let mut rules = RuleBook::new();
    rules
        .remove_missing(Selector::everything().with_pattern(r"\.keep$").unwrap(), false)
        .unwrap();
    let report = library
        .sync(&library.engine(rules, RecordingTranscoder::new()))
        .await;

    assert!(!library.target_exists("gone"));
    assert_eq!(library.target_files(), vec!["keep/a.mp3", "keep/notes.keep"]);
    assert_eq!(report.stats.files_removed, 1);
    assert_eq!(report.stats.directories_pruned, 1);
    assert!(library.target().exists());
}

#[tokio::test]
async fn test_second_run_with_keep_does_nothing() {
    let library = Library::new();
    library.add_source("x/one.flac");
    library.add_source("x/two.mp3");
    library.add_source("cover.jpg");

    let build_rules = || {
        let mut rules = RuleBook::new();
        rules
            .encode(Selector::lossless(), EncodeAction::convert_to("ogg"))
            .unwrap()
            .clobber(Selector::everything(), ClobberAction::Keep)
            .unwrap();
        rules
    };

    let transcoder = RecordingTranscoder::new();
    let first = library
        .sync(&library.engine(build_rules(), transcoder.clone()))
        .await;
    assert_eq!(first.stats.files_written(), 3);
    let files = library.target_files();
    assert_eq!(files, vec!["cover.jpg", "x/one.ogg", "x/two.mp3"]);

    let second = library
        .sync(&library.engine(build_rules(), transcoder.clone()))
        .await;
    assert_eq!(second.stats.files_written(), 0);
    assert_eq!(second.stats.files_kept, 3);
    assert_eq!(second.stats.files_removed, 0);
    assert!(second.jobs.is_empty());
    assert_eq!(library.target_files(), files);
    assert_eq!(transcoder.calls().len(), 1);
}

#[tokio::test]
async fn test_transcode_options() {
    let library = Library::new();
    library.add_source("one.wav");

    let mut rules = RuleBook::new();
    rules
        .encode(
            Selector::lossless(),
            EncodeAction::convert_with_quality(Some("ogg"), 6.0),
        )
        .unwrap()
        .options(Selector::lossless(), "-r 44100")
        .unwrap()
        .effect_options(Selector::codec("wav"), "gain -3")
        .unwrap();
    let transcoder = RecordingTranscoder::new();
    let report = library
        .sync(&library.engine(rules, transcoder.clone()))
        .await;

    assert_eq!(report.stats.files_transcoded, 1);
    let calls = transcoder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].output, library.target().join("one.ogg"));
    assert_eq!(calls[0].options, "-C 6 -r 44100");
    assert_eq!(calls[0].effect_options, "gain -3");
    assert_eq!(library.read_target("one.ogg"), "encoded -C 6 -r 44100 gain -3");
}

#[tokio::test]
async fn test_failed_encode_is_counted_and_run_continues() {
    let library = Library::new();
    library.add_source("broken.flac");
    library.add_source("fine.flac");
    library.add_source("notes.txt");

    let mut rules = RuleBook::new();
    rules
        .encode(Selector::lossless(), EncodeAction::convert_to("ogg"))
        .unwrap();
    let report = library
        .sync(&library.engine(rules, RecordingTranscoder::new()))
        .await;

    assert!(!report.is_success());
    assert_eq!(report.stats.errors, 1);
    assert_eq!(report.stats.files_transcoded, 1);
    assert_eq!(report.stats.files_copied, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].path.ends_with("broken.flac"));
    assert_eq!(library.target_files(), vec!["fine.ogg", "notes.txt"]);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let library = Library::new();
    library.add_source("a.flac");
    library.add_source("b.mp3");
    library.add_target("stale.mp3", "stale");

    let engine = library.engine_with(
        RuleBook::new(),
        RecordingTranscoder::new(),
        SyncOptions::dry_run(),
    );
    let report = library.sync(&engine).await;

    assert!(report.dry_run);
    assert_eq!(report.jobs.len(), 2);
    assert_eq!(report.stats.files_copied, 0);
    assert_eq!(report.cleanup.removed_files, vec![library.target().join("stale.mp3")]);
    assert_eq!(library.target_files(), vec!["stale.mp3"]);
}

#[tokio::test]
async fn test_dry_run_does_not_create_target() {
    let library = Library::new();
    library.add_source("a.flac");

    let engine = library.engine_with(
        RuleBook::new(),
        RecordingTranscoder::new(),
        SyncOptions::dry_run(),
    );
    let report = library.sync(&engine).await;

    assert_eq!(report.jobs.len(), 1);
    assert!(!library.target().exists());
}

#[tokio::test]
async fn test_playlist_source() {
    let library = Library::new();
    library.add_source("album/01.flac");
    library.add_source("album/02.flac");
    library.add_source("other/03.mp3");
    let playlist = library.source().join("favourites.m3u");
    std::fs::write(
        &playlist,
        "# picks\nalbum/02.flac\nother/03.mp3\nmissing.flac\nalbum/02.flac\n",
    )
    .unwrap();

    let report = library
        .engine(RuleBook::new(), RecordingTranscoder::new())
        .sync(SyncRequest::new("music/favourites.m3u", "mirror"))
        .await
        .unwrap();

    assert_eq!(report.stats.files_checked, 2);
    assert_eq!(library.target_files(), vec!["album/02.flac", "other/03.mp3"]);
}

#[tokio::test]
async fn test_cue_sheet_source() {
    let library = Library::new();
    library.add_source("live/disc.flac");
    std::fs::write(
        library.source().join("live/disc.cue"),
        "PERFORMER \"Band\"\nFILE \"disc.flac\" WAVE\n  TRACK 01 AUDIO\n",
    )
    .unwrap();

    let report = library
        .engine(RuleBook::new(), RecordingTranscoder::new())
        .sync(SyncRequest::new("music/live/disc.cue", "mirror"))
        .await
        .unwrap();

    assert_eq!(report.stats.files_copied, 1);
    assert_eq!(library.target_files(), vec!["disc.flac"]);
}

#[tokio::test]
async fn test_overlapping_roots_are_rejected() {
    let library = Library::new();
    library.add_source("a.flac");
    let engine = library.engine(RuleBook::new(), RecordingTranscoder::new());

    let error = engine
        .sync(SyncRequest::new("music", "music/mirror"))
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Config { .. }));
    assert!(!library.source().join("mirror").exists());
}

#[tokio::test]
async fn test_rules_from_configuration() {
    let library = Library::new();
    library.add_source("a.flac");
    library.add_source("b.mp3");
    library.add_source("c.wav");
    library.add_target("notes.keep", "mine");

    let rules: RulesConfig = serde_yaml::from_str(
        r#"
encode:
  - { match: { category: lossy, min_bitrate: 96 }, action: skip }
  - { match: { category: lossless }, action: { extension: ogg, quality: 6 } }
  - { match: { category: lossless, extension: wav }, action: copy }
remove_missing:
  - { match: { pattern: "\\.keep$" }, action: false }
"#,
    )
    .unwrap();
    let transcoder = RecordingTranscoder::new();
    let report = library
        .sync(&library.engine(rules.rule_book().unwrap(), transcoder.clone()))
        .await;

    assert!(report.is_success());
    assert_eq!(report.stats.files_skipped, 1);
    assert_eq!(
        library.target_files(),
        vec!["a.ogg", "c.wav", "notes.keep"]
    );
    assert_eq!(transcoder.calls()[0].options, "-C 6 ");
}

fn wav_library(count: usize) -> (Library, RuleBook) {
    let library = Library::new();
    for n in 1..=count {
        library.add_source(&format!("{}.wav", n));
    }
    library.add_target("stale.mp3", "stale");

    let mut rules = RuleBook::new();
    rules
        .encode(Selector::lossless(), EncodeAction::convert_to("ogg"))
        .unwrap();
    (library, rules)
}

fn single_encoder() -> SyncOptions {
    SyncOptions {
        pool_tick: Duration::from_millis(20),
        ..SyncOptions::default().with_threads(ThreadCount::new(1).unwrap())
    }
}

#[tokio::test]
async fn test_stop_finishes_running_encode_and_drops_queued() {
    let (library, rules) = wav_library(3);
    let (transcoder, mut started) = GatedTranscoder::new();
    let engine = library.engine_with(rules, transcoder.clone(), single_encoder());
    let signal = engine.shutdown_signal();

    let run = tokio::spawn(async move { engine.sync(SyncRequest::new("music", "mirror")).await });

    let first: PathBuf = timeout(Duration::from_secs(5), started.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(first.ends_with("1.wav"));

    signal.trigger();
    tokio::time::sleep(Duration::from_millis(100)).await;
    transcoder.release(10);

    let report = timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.stats.files_transcoded, 1);
    assert!(started.try_recv().is_err());
    assert_eq!(library.target_files(), vec!["1.ogg", "stale.mp3"]);
}

#[tokio::test]
async fn test_kill_abandons_running_encode() {
    let (library, rules) = wav_library(2);
    let (transcoder, mut started) = GatedTranscoder::new();
    let engine = library.engine_with(rules, transcoder, single_encoder());
    let signal = engine.shutdown_signal();

    let run = tokio::spawn(async move { engine.sync(SyncRequest::new("music", "mirror")).await });
    timeout(Duration::from_secs(5), started.recv())
        .await
        .unwrap()
        .unwrap();

    signal.trigger();
    signal.trigger();

    let report = timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.stats.files_transcoded, 0);
    assert_eq!(library.target_files(), vec!["stale.mp3"]);
}
