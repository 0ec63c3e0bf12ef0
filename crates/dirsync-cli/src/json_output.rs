//! JSON output structures for the dirsync CLI

use dirsync_engine::{SyncJob, SyncPhase, SyncReport};
use dirsync_types::SyncAction;
use serde::Serialize;

/// Complete JSON output for a sync run
#[derive(Debug, Serialize)]
pub struct SyncResultJson {
    /// Run metadata
    pub metadata: OperationMetadata,
    /// Counters
    pub stats: SyncStatsJson,
    /// Entries that failed
    pub failures: Vec<FailureJson>,
    /// Overall result
    pub result: OperationResult,
}

/// Run metadata
#[derive(Debug, Serialize)]
pub struct OperationMetadata {
    /// dirsync version
    pub version: String,
    /// Job identifier, matches the `job_id` field of log events
    pub job_id: String,
    /// Source root
    pub source_path: String,
    /// Target root
    pub target_path: String,
    /// Whether target entries absent from the source were removed
    pub delete_missing: bool,
    /// Whether this was a dry run
    pub dry_run: bool,
}

/// Counters in JSON form
#[derive(Debug, Serialize)]
pub struct SyncStatsJson {
    /// Directories created
    pub dirs_created: u64,
    /// Files copied
    pub files_copied: u64,
    /// Bytes copied
    pub bytes_copied: u64,
    /// Files left alone
    pub files_unchanged: u64,
    /// Files removed
    pub files_removed: u64,
    /// Directories removed
    pub dirs_removed: u64,
    /// Directories kept because they were not empty
    pub dirs_retained: u64,
    /// Failed entries
    pub errors: u64,
    /// Duration in milliseconds
    pub duration_ms: u128,
}

/// One failed entry
#[derive(Debug, Serialize)]
pub struct FailureJson {
    /// Path relative to its root
    pub path: String,
    /// Action that failed
    pub action: SyncAction,
    /// Error message
    pub error: String,
}

/// Overall result
#[derive(Debug, Serialize)]
pub struct OperationResult {
    /// Whether every entry succeeded
    pub success: bool,
    /// Last phase reached
    pub phase: SyncPhase,
}

impl SyncResultJson {
    /// Build the JSON view of a finished run
    pub fn new(job: &SyncJob, report: &SyncReport) -> Self {
        let stats = &report.stats;
        Self {
            metadata: OperationMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                job_id: report.job_id.to_string(),
                source_path: job.source().display().to_string(),
                target_path: job.target().display().to_string(),
                delete_missing: job.options().delete_missing,
                dry_run: report.dry_run,
            },
            stats: SyncStatsJson {
                dirs_created: stats.dirs_created,
                files_copied: stats.files_copied,
                bytes_copied: stats.bytes_copied,
                files_unchanged: stats.files_unchanged,
                files_removed: stats.files_removed,
                dirs_removed: stats.dirs_removed,
                dirs_retained: stats.dirs_retained,
                errors: stats.errors,
                duration_ms: stats.duration.as_millis(),
            },
            failures: report
                .failures()
                .map(|outcome| FailureJson {
                    path: outcome.path.display().to_string(),
                    action: outcome.action,
                    error: outcome
                        .error
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                })
                .collect(),
            result: OperationResult {
                success: report.is_clean(),
                phase: report.phase,
            },
        }
    }
}
