//! Display utilities for the tunemirror CLI

use crate::json_output::ProbeJson;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tunemirror_sync::SyncReport;

/// Print the summary of a run
pub fn print_sync_stats(report: &SyncReport) {
    let stats = &report.stats;
    let title = if report.dry_run {
        "Sync Statistics (dry run):"
    } else {
        "Sync Statistics:"
    };

    println!();
    println!("{}", style(title).bold().underlined());
    println!("  Files checked: {}", style(stats.files_checked).cyan());
    println!("  Files copied: {}", style(stats.files_copied).green());
    println!("  Files encoded: {}", style(stats.files_transcoded).green());
    println!("  Files skipped: {}", style(stats.files_skipped).yellow());
    println!("  Targets kept: {}", style(stats.files_kept).yellow());
    println!("  Files removed: {}", style(stats.files_removed).magenta());
    println!(
        "  Directories pruned: {}",
        style(stats.directories_pruned).magenta()
    );
    println!(
        "  Errors: {}",
        if stats.errors > 0 {
            style(stats.errors).red()
        } else {
            style(stats.errors).green()
        }
    );
    println!(
        "  Duration: {}",
        style(format_duration(stats.duration)).blue()
    );

    for error in &report.errors {
        display_error(&format!("{}: {}", error.path.display(), error.message));
    }
    if report.cancelled {
        display_warning("Run was interrupted; stale files were not removed");
    }
}

/// Print one probe result
pub fn print_probe(report: &ProbeJson) {
    println!("{}", style(report.path.display()).cyan().bold());
    if !report.audio {
        println!("  Kind: {}", style("not audio").dim());
        return;
    }
    println!(
        "  Codec: {}{}",
        style(&report.codec).green(),
        if report.lossless { " (lossless)" } else { "" }
    );
    println!("  Bitrate: {:.0} kbps", report.bitrate_kbps);
    println!(
        "  Duration: {}",
        format_duration(Duration::try_from_secs_f64(report.duration_seconds).unwrap_or_default())
    );
    if let Some(encoding) = &report.encoding {
        println!("  Encoding: {}", encoding);
    }
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Display a warning message with proper formatting
pub fn display_warning(message: &str) {
    println!("{} {}", style("⚠").yellow().bold(), style(message).yellow());
}

/// Display an error message with proper formatting
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), style(message).red());
}

/// Display a success message with proper formatting
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), style(message).green());
}

/// Display an info message with proper formatting
pub fn display_info(message: &str) {
    println!("{} {}", style("ℹ").blue().bold(), style(message).blue());
}

/// Spinner shown while a run is in progress
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Duration::from_millis(1500), "1.50s")]
    #[case(Duration::from_secs(125), "2m 5s")]
    #[case(Duration::from_secs(3725), "1h 2m 5s")]
    fn test_format_duration(#[case] duration: Duration, #[case] expected: &str) {
        assert_eq!(format_duration(duration), expected);
    }
}
