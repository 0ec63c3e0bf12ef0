//! dirsync - one-way directory synchronization tool
//!
//! Mirrors a source directory into a target directory, copying new and
//! changed files and optionally removing target entries the source no longer
//! has.

mod display;
mod json_output;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dirsync_config::{Config, ConfigLoader, SyncConfig};
use dirsync_engine::{SyncJob, SyncOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// dirsync - one-way directory synchronization tool
#[derive(Parser, Debug)]
#[command(
    name = "dirsync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Mirror a source directory into a target directory",
    long_about = "dirsync copies new and changed files from SOURCE into TARGET, creating\n\
                  directories as needed and preserving modification times. Files are\n\
                  compared by size and modification time. With --delete-missing, entries\n\
                  in TARGET that are absent from SOURCE are removed."
)]
struct Cli {
    /// Source directory
    source: PathBuf,

    /// Target directory
    target: PathBuf,

    /// Remove target entries that don't exist in the source
    #[arg(long)]
    delete_missing: bool,

    /// Dry run - show what would be done
    #[arg(long)]
    dry_run: bool,

    /// Descend into symlinked directories
    #[arg(long)]
    follow_symlinks: bool,

    /// Treat modification times up to this many milliseconds apart as equal
    #[arg(
        long,
        value_name = "MS",
        value_parser = clap::value_parser!(u64).range(..=SyncConfig::MAX_TOLERANCE_MS)
    )]
    modify_window: Option<u64>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable trace logging
    #[arg(short, long)]
    debug: bool,

    /// Verbose mode - log planning and skipped entries
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,

    /// Emit log events as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Fold command line flags over loaded configuration
    fn apply_to(&self, config: &mut Config) {
        config.sync.delete_missing |= self.delete_missing;
        config.sync.dry_run |= self.dry_run;
        config.sync.follow_symlinks |= self.follow_symlinks;
        if let Some(window) = self.modify_window {
            config.sync.mtime_tolerance_ms = window;
        }
        config.logging.json_format |= self.json_logs;
        if self.debug {
            config.logging.level = "trace".to_string();
        } else if self.verbose {
            config.logging.level = "debug".to_string();
        } else if self.quiet {
            config.logging.level = "error".to_string();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ConfigLoader::load_default().context("Failed to load configuration")?,
    };
    cli.apply_to(&mut config);

    init_logging(&config)?;

    info!("dirsync v{} starting", env!("CARGO_PKG_VERSION"));

    sync_command(&cli, &config)
}

fn init_logging(config: &Config) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log filter")?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    if config.logging.json_format {
        builder.json().init();
    } else {
        builder.with_ansi(config.logging.colored_output).init();
    }

    Ok(())
}

fn sync_command(cli: &Cli, config: &Config) -> Result<()> {
    check_root("Source", &cli.source)?;
    check_root("Target", &cli.target)?;

    let options = SyncOptions::from(&config.sync);
    let job = SyncJob::new(&cli.source, &cli.target, options.delete_missing).with_options(options);

    if !cli.quiet && !cli.json {
        display::print_header(&job);
    }

    let report = job.run()?;

    if cli.json {
        let output = json_output::SyncResultJson::new(&job, &report);
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !cli.quiet {
        display::print_sync_stats(&report);
        display::print_failures(&report);
    }

    Ok(())
}

fn check_root(label: &str, path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("{} directory does not exist: {}", label, path.display());
    }
    if !path.is_dir() {
        bail!("{} is not a directory: {}", label, path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_requires_two_positionals() {
        let err = Cli::try_parse_from(["dirsync", "only-source"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "dirsync",
            "src",
            "dst",
            "--delete-missing",
            "--modify-window",
            "2000",
            "-v",
        ])
        .unwrap();
        let mut config = Config::default();

        cli.apply_to(&mut config);

        assert!(config.sync.delete_missing);
        assert!(!config.sync.dry_run);
        assert_eq!(config.sync.mtime_tolerance_ms, 2000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_values_survive_without_flags() {
        let cli = Cli::try_parse_from(["dirsync", "src", "dst"]).unwrap();
        let mut config = Config::default();
        config.sync.delete_missing = true;
        config.sync.mtime_tolerance_ms = 500;
        config.logging.level = "warn".to_string();

        cli.apply_to(&mut config);

        assert!(config.sync.delete_missing);
        assert_eq!(config.sync.mtime_tolerance_ms, 500);
        assert_eq!(config.logging.level, "warn");
    }

    #[rstest]
    #[case::debug("-d", "trace")]
    #[case::verbose("-v", "debug")]
    #[case::quiet("-q", "error")]
    fn test_verbosity_flags(#[case] flag: &str, #[case] level: &str) {
        let cli = Cli::try_parse_from(["dirsync", flag, "src", "dst"]).unwrap();
        let mut config = Config::default();

        cli.apply_to(&mut config);

        assert_eq!(config.logging.level, level);
    }

    #[test]
    fn test_modify_window_is_capped() {
        let cap = SyncConfig::MAX_TOLERANCE_MS.to_string();
        let cli = Cli::try_parse_from(["dirsync", "--modify-window", &cap, "src", "dst"]).unwrap();
        assert_eq!(cli.modify_window, Some(SyncConfig::MAX_TOLERANCE_MS));

        let err = Cli::try_parse_from(["dirsync", "--modify-window", "999999999999", "src", "dst"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_check_root() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();

        assert!(check_root("Source", temp_dir.path()).is_ok());
        assert!(check_root("Source", &file).is_err());
        assert!(check_root("Source", &temp_dir.path().join("missing")).is_err());
    }
}
