//! Console output for the dirsync CLI

use console::style;
use dirsync_engine::{SyncJob, SyncReport};
use std::time::Duration;

/// Print what is about to be synchronized
pub fn print_header(job: &SyncJob) {
    let mode = match (job.options().delete_missing, job.options().dry_run) {
        (true, true) => "mirror, dry run",
        (true, false) => "mirror",
        (false, true) => "update, dry run",
        (false, false) => "update",
    };
    println!(
        "{} {} {} {} ({})",
        style("Syncing").bold(),
        style(job.source().display()).cyan(),
        style("->").dim(),
        style(job.target().display()).cyan(),
        style(mode).yellow()
    );
}

/// Print the statistics of a finished run
pub fn print_sync_stats(report: &SyncReport) {
    let stats = &report.stats;
    let title = if report.dry_run {
        "Sync Statistics (dry run, nothing changed):"
    } else {
        "Sync Statistics:"
    };

    println!();
    println!("{}", style(title).bold().underlined());
    println!("  Directories created: {}", style(stats.dirs_created).green());
    println!("  Files copied: {}", style(stats.files_copied).green());
    println!(
        "  Bytes copied: {}",
        style(format_bytes(stats.bytes_copied)).green()
    );
    println!("  Files unchanged: {}", style(stats.files_unchanged).dim());
    println!("  Files removed: {}", style(stats.files_removed).yellow());
    println!(
        "  Directories removed: {}",
        style(stats.dirs_removed).yellow()
    );
    if stats.dirs_retained > 0 {
        println!(
            "  Directories kept (not empty): {}",
            style(stats.dirs_retained).yellow()
        );
    }
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
    if stats.bytes_copied > 0 && !report.dry_run {
        println!(
            "  Transfer rate: {}",
            style(format!("{}/s", format_bytes(stats.transfer_rate() as u64))).blue()
        );
    }
}

/// Print every entry that failed
pub fn print_failures(report: &SyncReport) {
    let mut failures = report.failures().peekable();
    if failures.peek().is_none() {
        return;
    }

    println!();
    println!("{}", style("Failed entries:").red().bold());
    for outcome in failures {
        let reason = outcome
            .error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        println!(
            "  {} {} {}",
            style(outcome.action).yellow(),
            outcome.path.display(),
            style(reason).dim()
        );
    }
}

/// Format a byte count with a binary unit
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format a duration for humans
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
