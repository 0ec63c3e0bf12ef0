//! Main synchronization engine

use crate::diff::{self, ForwardStep, RemoveStep};
use crate::fs::{FileSystem, LocalFs};
use crate::identity::IdentityPolicy;
use crate::sink::{EventSink, TracingSink};
use crate::tree::{self, TreeSnapshot};
use dirsync_config::SyncConfig;
use dirsync_types::{EntryKind, EntryOutcome, Error, FileSize, Result, SyncAction, SyncStats};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, info_span, trace};

/// Stage of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncPhase {
    /// Creating directories and copying files
    ForwardSync,
    /// Removing target entries that are absent from the source
    Cleanup,
    /// Run finished
    Done,
}

/// Synchronization options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Remove target entries that don't exist in the source
    pub delete_missing: bool,
    /// Plan and report without touching the target
    pub dry_run: bool,
    /// Descend into symlinked directories of the source; target links are
    /// always treated as plain entries
    pub follow_symlinks: bool,
    /// When two files count as the same
    pub identity: IdentityPolicy,
}

impl SyncOptions {
    /// Create options for mirror sync (delete extra entries)
    pub fn mirror() -> Self {
        Self {
            delete_missing: true,
            ..Self::default()
        }
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            delete_missing: config.delete_missing,
            dry_run: config.dry_run,
            follow_symlinks: config.follow_symlinks,
            identity: IdentityPolicy::with_tolerance(config.mtime_tolerance()),
        }
    }
}

/// One synchronization job: a source root mirrored into a target root
#[derive(Debug, Clone)]
pub struct SyncJob {
    source: PathBuf,
    target: PathBuf,
    options: SyncOptions,
    job_id: uuid::Uuid,
}

impl SyncJob {
    /// Create a job; nothing is checked until it runs
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(source: P, target: Q, delete_missing: bool) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            target: target.as_ref().to_path_buf(),
            options: SyncOptions {
                delete_missing,
                ..SyncOptions::default()
            },
            job_id: uuid::Uuid::new_v4(),
        }
    }

    /// Set sync options
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Source root
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Target root
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Sync options
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Identifier used to tag this job's log events
    pub fn job_id(&self) -> uuid::Uuid {
        self.job_id
    }

    /// Run against the local filesystem, logging through `tracing`
    pub fn run(&self) -> Result<SyncReport> {
        Synchronizer::new(LocalFs, TracingSink::new()).run(self)
    }
}

/// What a run did
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Job that produced this report
    pub job_id: uuid::Uuid,
    /// Last phase reached
    pub phase: SyncPhase,
    /// Whether nothing was actually changed
    pub dry_run: bool,
    /// Every action taken or attempted, in execution order
    pub outcomes: Vec<EntryOutcome>,
    /// Aggregate counters
    pub stats: SyncStats,
}

impl SyncReport {
    fn new(job: &SyncJob) -> Self {
        Self {
            job_id: job.job_id,
            phase: SyncPhase::ForwardSync,
            dry_run: job.options.dry_run,
            outcomes: Vec::new(),
            stats: SyncStats::new(),
        }
    }

    /// Outcomes that carry an error
    pub fn failures(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.outcomes.iter().filter(|o| o.failed())
    }

    /// Whether every entry was handled without error
    pub fn is_clean(&self) -> bool {
        self.stats.errors == 0
    }
}

/// Runs sync jobs over a filesystem, reporting to an event sink
#[derive(Debug)]
pub struct Synchronizer<F, S> {
    fs: F,
    sink: S,
}

impl<F: FileSystem, S: EventSink> Synchronizer<F, S> {
    /// Create a synchronizer
    pub fn new(fs: F, sink: S) -> Self {
        Self { fs, sink }
    }

    /// Filesystem in use
    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Event sink in use
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Take the filesystem and sink back
    pub fn into_parts(self) -> (F, S) {
        (self.fs, self.sink)
    }

    /// Run one job
    ///
    /// Returns an error only when the source root cannot be scanned, or the
    /// target root exists but cannot be scanned. Everything else is reported
    /// per entry in the returned [`SyncReport`] and to the sink.
    pub fn run(&mut self, job: &SyncJob) -> Result<SyncReport> {
        let span = info_span!("sync", job_id = %job.job_id);
        let _guard = span.enter();
        let start_time = Instant::now();
        let options = job.options;

        info!(
            "Starting sync: {} -> {}",
            job.source.display(),
            job.target.display()
        );
        self.sink.on_start(job);

        let source = self
            .fs
            .scan(&job.source, options.follow_symlinks)
            .map_err(|e| Error::source_root(&job.source, e))?;
        // Links in the target are never descended into, so nothing outside
        // the target root is ever written or removed
        let target = match self.fs.exists(&job.target) {
            Ok(false) => TreeSnapshot::new(&job.target),
            Ok(true) => self
                .fs
                .scan(&job.target, false)
                .map_err(|e| Error::target_root(&job.target, e))?,
            Err(e) => return Err(Error::target_root(&job.target, e)),
        };

        let plan = diff::plan(&source, &target, &options.identity, options.delete_missing);
        let mut report = SyncReport::new(job);

        self.enter(&mut report, SyncPhase::ForwardSync);
        for scanned in [&source, &target] {
            for scan_error in scanned.errors() {
                let location = scanned.resolve(&scan_error.path);
                let outcome = EntryOutcome::err(
                    scan_error.path.clone(),
                    SyncAction::Access,
                    scan_error.error.clone(),
                );
                self.emit(&mut report, outcome, &location, 0);
            }
        }
        for step in plan.forward() {
            self.forward(job, step, &mut report);
        }

        if options.delete_missing {
            self.enter(&mut report, SyncPhase::Cleanup);
            self.cleanup(job, plan.cleanup(), &target, &mut report);
        }

        self.enter(&mut report, SyncPhase::Done);
        report.stats.duration = start_time.elapsed();

        info!(
            "Sync completed: {} changes, {} unchanged, {} errors in {:?}",
            report.stats.total_changes(),
            report.stats.files_unchanged,
            report.stats.errors,
            report.stats.duration
        );
        Ok(report)
    }

    fn enter(&mut self, report: &mut SyncReport, phase: SyncPhase) {
        report.phase = phase;
        self.sink.on_phase(phase);
    }

    fn emit(
        &mut self,
        report: &mut SyncReport,
        outcome: EntryOutcome,
        location: &Path,
        bytes: FileSize,
    ) {
        self.sink.on_outcome(&outcome, location);
        report.stats.record(&outcome, bytes);
        report.outcomes.push(outcome);
    }

    fn forward(&mut self, job: &SyncJob, step: &ForwardStep, report: &mut SyncReport) {
        let dry_run = job.options.dry_run;
        match step {
            ForwardStep::CreateDir { path } => {
                let location = tree::resolve(&job.target, path);
                let outcome = if dry_run {
                    EntryOutcome::ok(path.clone(), SyncAction::CreateDir)
                } else {
                    match self.fs.create_dir_all(&location) {
                        Ok(()) => EntryOutcome::ok(path.clone(), SyncAction::CreateDir),
                        Err(e) => EntryOutcome::err(
                            path.clone(),
                            SyncAction::CreateDir,
                            Error::io_at(&location, e),
                        ),
                    }
                };
                self.emit(report, outcome, &location, 0);
            }
            ForwardStep::Copy { path, size, reason } => {
                let from = tree::resolve(&job.source, path);
                let location = tree::resolve(&job.target, path);
                debug!("Copying {} ({:?})", path.display(), reason);
                let (outcome, bytes) = if dry_run {
                    (EntryOutcome::ok(path.clone(), SyncAction::CopyFile), *size)
                } else {
                    match self.fs.copy_file(&from, &location) {
                        Ok(bytes) => (EntryOutcome::ok(path.clone(), SyncAction::CopyFile), bytes),
                        Err(e) => (EntryOutcome::err(path.clone(), SyncAction::CopyFile, e), 0),
                    }
                };
                self.emit(report, outcome, &location, bytes);
            }
            ForwardStep::UpToDate { path } => {
                trace!("Up to date: {}", path.display());
                report.stats.files_unchanged += 1;
            }
            ForwardStep::Conflict {
                path,
                source_kind,
                target_kind,
            } => {
                let location = tree::resolve(&job.target, path);
                let action = if source_kind.is_dir() {
                    SyncAction::CreateDir
                } else {
                    SyncAction::CopyFile
                };
                let error = Error::KindMismatch {
                    path: location.clone(),
                    source_kind: *source_kind,
                    target_kind: *target_kind,
                };
                self.emit(report, EntryOutcome::err(path.clone(), action, error), &location, 0);
            }
            ForwardStep::Unsupported { path } => {
                let location = tree::resolve(&job.source, path);
                let error = Error::Unsupported {
                    path: location.clone(),
                };
                self.emit(
                    report,
                    EntryOutcome::err(path.clone(), SyncAction::Access, error),
                    &location,
                    0,
                );
            }
            ForwardStep::Blocked { path } => {
                debug!("Skipping {}: target path unreadable or not a directory", path.display());
            }
        }
    }

    fn cleanup(
        &mut self,
        job: &SyncJob,
        steps: &[RemoveStep],
        target: &TreeSnapshot,
        report: &mut SyncReport,
    ) {
        // Directories that must survive because something inside them does
        let mut pinned: HashSet<PathBuf> = HashSet::new();
        for scan_error in target.errors() {
            pin_with_parent(&mut pinned, &scan_error.path);
        }

        for step in steps {
            let location = tree::resolve(&job.target, &step.path);

            if pinned.contains(&step.path) {
                if step.kind.is_dir() {
                    debug!("Keeping non-empty directory {}", location.display());
                    report.stats.dirs_retained += 1;
                }
                pin_parent(&mut pinned, &step.path);
                continue;
            }

            let counterpart = tree::resolve(&job.source, &step.path);
            match self.fs.exists(&counterpart) {
                Ok(false) => {}
                Ok(true) => {
                    debug!("{} reappeared in source, keeping it", step.path.display());
                    pin_parent(&mut pinned, &step.path);
                    continue;
                }
                Err(e) => {
                    let outcome = EntryOutcome::err(
                        step.path.clone(),
                        SyncAction::Access,
                        Error::io_at(&counterpart, e),
                    );
                    self.emit(report, outcome, &counterpart, 0);
                    pin_parent(&mut pinned, &step.path);
                    continue;
                }
            }

            let action = if step.kind.is_dir() {
                SyncAction::RemoveDir
            } else {
                SyncAction::RemoveFile
            };
            let result = if job.options.dry_run {
                Ok(())
            } else if step.kind == EntryKind::Directory {
                self.fs.remove_dir(&location)
            } else {
                self.fs.remove_file(&location)
            };

            let outcome = match result {
                Ok(()) => EntryOutcome::ok(step.path.clone(), action),
                Err(e) => {
                    pin_parent(&mut pinned, &step.path);
                    EntryOutcome::err(step.path.clone(), action, Error::io_at(&location, e))
                }
            };
            self.emit(report, outcome, &location, 0);
        }
    }
}

fn pin_parent(pinned: &mut HashSet<PathBuf>, path: &Path) {
    if let Some(parent) = path.parent() {
        pinned.insert(parent.to_path_buf());
    }
}

fn pin_with_parent(pinned: &mut HashSet<PathBuf>, path: &Path) {
    pinned.insert(path.to_path_buf());
    pin_parent(pinned, path);
}
