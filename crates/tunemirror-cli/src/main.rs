//! tunemirror - mirror a music library, transcoding by rule
//!
//! Keeps a target directory in step with a source library (or a playlist / cue sheet),
//! copying or re-encoding each file according to the configured rule tables and removing
//! target files whose source has gone.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tunemirror_config::{Config, ConfigBuilder, ConfigLoader};
use tunemirror_engine::{ShutdownLevel, ShutdownSignal};
use tunemirror_media::{MediaDescriptor, SoxProbe, SoxTranscoder};
use tunemirror_sync::{SyncEngine, SyncOptions, SyncRequest};
use tunemirror_types::ThreadCount;

mod display;
mod json_output;

/// tunemirror - mirror a music library, transcoding by rule
#[derive(Parser)]
#[command(
    name = "tunemirror",
    version = env!("CARGO_PKG_VERSION"),
    about = "Mirror a music library, copying or transcoding each file by rule",
    long_about = "tunemirror keeps a target directory in step with a music library.\n\
                  Each source file is copied, re-encoded with sox, or skipped according to\n\
                  rule tables, and target files without a source are removed."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Quiet mode - errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose mode - log every file
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mirror a library (or a playlist / cue sheet) into a target directory
    Sync {
        /// Source directory, playlist or cue sheet
        source: PathBuf,
        /// Target directory
        target: PathBuf,
        /// Show what would be done without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,
        /// Number of concurrent encoders
        #[arg(short, long)]
        threads: Option<usize>,
        /// sox executable
        #[arg(long)]
        sox: Option<PathBuf>,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what the prober reports for files
    Probe {
        /// Files to inspect
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// sox executable
        #[arg(long)]
        sox: Option<PathBuf>,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
        /// Write the configuration to a file (.yaml, .toml or .json)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    let level = log_level(&cli, &config);
    init_logging(level, cli.json_logs || config.logging.json_format)?;

    info!("tunemirror v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Sync {
            source,
            target,
            dry_run,
            threads,
            sox,
            json,
        } => {
            let show_spinner = !cli.quiet && !json && matches!(level, "warn" | "error");
            sync_command(
                config,
                SyncArgs {
                    source,
                    target,
                    dry_run,
                    threads,
                    sox,
                    json,
                    quiet: cli.quiet,
                    show_spinner,
                },
            )
            .await?;
        }
        Commands::Probe { paths, sox, json } => {
            probe_command(&config, &paths, sox, json)?;
        }
        Commands::Config { default, output } => {
            config_command(config, cli.config.as_deref(), default, output)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ConfigLoader::load_default().context("Failed to load configuration")?,
    };
    Ok(config)
}

fn log_level(cli: &Cli, config: &Config) -> &'static str {
    if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        match config.logging.level.as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "error" => "error",
            _ => "warn",
        }
    }
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

struct SyncArgs {
    source: PathBuf,
    target: PathBuf,
    dry_run: bool,
    threads: Option<usize>,
    sox: Option<PathBuf>,
    json: bool,
    quiet: bool,
    show_spinner: bool,
}

async fn sync_command(config: Config, args: SyncArgs) -> Result<()> {
    let threads = match args.threads {
        Some(count) => ThreadCount::new(count).map_err(anyhow::Error::msg)?,
        None => config.performance.threads,
    };
    let options = SyncOptions {
        threads,
        dry_run: args.dry_run || config.sync.dry_run,
        preserve_timestamps: config.sync.preserve_timestamps,
        rename_limit: config.sync.rename_attempt_limit,
        base_dir: None,
        pool_tick: config.performance.pool_tick(),
    };
    let rules = config.rules.rule_book()?;
    let sox = args.sox.unwrap_or_else(|| config.encoder.sox_path.clone());

    if !args.quiet && !args.json {
        println!(
            "{} Mirroring {} to {}",
            style("⟲").blue().bold(),
            style(args.source.display()).cyan(),
            style(args.target.display()).cyan()
        );
        if options.dry_run {
            display::display_info("Dry run mode - no changes will be made");
        }
    }

    let engine = SyncEngine::new(
        rules,
        Arc::new(SoxProbe::new(&sox)),
        Arc::new(SoxTranscoder::new(&sox)),
        options,
    );
    let interrupts = tokio::spawn(handle_interrupts(engine.shutdown_signal()));

    let spinner = args
        .show_spinner
        .then(|| display::create_spinner("Mirroring library..."));

    let request = SyncRequest::new(&args.source, &args.target);
    let result = engine.sync(request).await;
    interrupts.abort();

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if args.json {
                json_output::print_failure(&args.source, &args.target, &e.to_string())?;
            }
            return Err(e.into());
        }
    };

    if args.json {
        json_output::print_report(&report)?;
    } else if !args.quiet {
        display::print_sync_stats(&report);
    }

    if report.cancelled {
        bail!("Sync cancelled");
    }
    if report.stats.errors > 0 {
        bail!("{} file(s) failed", report.stats.errors);
    }
    Ok(())
}

/// First Ctrl-C stops after running jobs, the second abandons them
async fn handle_interrupts(signal: ShutdownSignal) {
    while tokio::signal::ctrl_c().await.is_ok() {
        match signal.trigger() {
            ShutdownLevel::Stop => {
                warn!("Interrupted: finishing running jobs (press Ctrl-C again to abort)");
            }
            ShutdownLevel::Kill => {
                warn!("Interrupted again: aborting running jobs");
                break;
            }
            ShutdownLevel::Running => {}
        }
    }
}

fn probe_command(config: &Config, paths: &[PathBuf], sox: Option<PathBuf>, json: bool) -> Result<()> {
    let sox = sox.unwrap_or_else(|| config.encoder.sox_path.clone());
    let probe = Arc::new(SoxProbe::new(sox));

    let mut reports = Vec::with_capacity(paths.len());
    for path in paths {
        let file = match MediaDescriptor::open(path, probe.clone()) {
            Ok(file) => file,
            Err(e) => {
                display::display_error(&format!("{}: {}", path.display(), e));
                continue;
            }
        };
        reports.push(json_output::ProbeJson::from_descriptor(&file));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            display::print_probe(report);
        }
    }

    if reports.len() < paths.len() {
        bail!("{} file(s) could not be probed", paths.len() - reports.len());
    }
    Ok(())
}

fn config_command(
    config: Config,
    config_path: Option<&Path>,
    default: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = if default {
        ConfigBuilder::new().build()?
    } else {
        config
    };

    if let Some(path) = output {
        ConfigLoader::save_to_file(&config, &path)?;
        display::display_success(&format!("Configuration written to {}", path.display()));
        return Ok(());
    }

    let label = if default { "Default" } else { "Current" };
    println!("{} {} configuration:", style("⚙").blue().bold(), label);
    if !default {
        match config_path.map(Path::to_path_buf).or_else(ConfigLoader::config_exists) {
            Some(path) => println!("# loaded from {}", path.display()),
            None => println!("# no configuration file found, showing defaults"),
        }
    }
    print!("{}", ConfigLoader::to_yaml(&config)?);
    Ok(())
}
