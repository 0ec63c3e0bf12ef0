//! Event sinks
//!
//! The synchronizer reports every phase change and every entry it acts on to
//! an [`EventSink`]. [`TracingSink`] turns them into structured log events;
//! [`RecordingSink`] keeps them in memory.

use crate::engine::{SyncJob, SyncPhase};
use dirsync_types::{EntryOutcome, SyncAction};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Receives sync events as they happen
pub trait EventSink {
    /// A run is starting
    fn on_start(&mut self, _job: &SyncJob) {}

    /// The run entered a new phase
    fn on_phase(&mut self, _phase: SyncPhase) {}

    /// An action was taken on one entry; `location` is its absolute path
    fn on_outcome(&mut self, outcome: &EntryOutcome, location: &Path);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn on_start(&mut self, job: &SyncJob) {
        (**self).on_start(job);
    }

    fn on_phase(&mut self, phase: SyncPhase) {
        (**self).on_phase(phase);
    }

    fn on_outcome(&mut self, outcome: &EntryOutcome, location: &Path) {
        (**self).on_outcome(outcome, location);
    }
}

/// Logs events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink {
    dry_run: bool,
}

impl TracingSink {
    /// Create a tracing sink
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for TracingSink {
    fn on_start(&mut self, job: &SyncJob) {
        self.dry_run = job.options().dry_run;
    }

    fn on_phase(&mut self, phase: SyncPhase) {
        debug!(?phase, "Sync phase changed");
    }

    fn on_outcome(&mut self, outcome: &EntryOutcome, location: &Path) {
        let path = location.display();
        match &outcome.error {
            None if self.dry_run => {
                info!(action = %outcome.action, %path, "Would {}", verb(outcome.action));
            }
            None => {
                info!(action = %outcome.action, %path, "{}", past_tense(outcome.action));
            }
            Some(error) if outcome.action == SyncAction::Access => {
                warn!(action = %outcome.action, %path, %error, "Cannot access entry");
            }
            Some(error) => {
                warn!(
                    action = %outcome.action,
                    %path,
                    %error,
                    "Failed to {}",
                    verb(outcome.action)
                );
            }
        }
    }
}

fn verb(action: SyncAction) -> &'static str {
    match action {
        SyncAction::CreateDir => "create directory",
        SyncAction::CopyFile => "copy file",
        SyncAction::RemoveFile => "remove file",
        SyncAction::RemoveDir => "remove directory",
        SyncAction::Access => "access entry",
    }
}

fn past_tense(action: SyncAction) -> &'static str {
    match action {
        SyncAction::CreateDir => "Created directory",
        SyncAction::CopyFile => "Copied file",
        SyncAction::RemoveFile => "Removed file",
        SyncAction::RemoveDir => "Removed directory",
        SyncAction::Access => "Accessed entry",
    }
}

/// Keeps every event in memory, in arrival order
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    phases: Vec<SyncPhase>,
    events: Vec<(EntryOutcome, PathBuf)>,
}

impl RecordingSink {
    /// Create an empty recording sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Phases entered so far
    pub fn phases(&self) -> &[SyncPhase] {
        &self.phases
    }

    /// Outcomes with their absolute locations
    pub fn events(&self) -> &[(EntryOutcome, PathBuf)] {
        &self.events
    }

    /// Absolute locations of events with the given action
    pub fn locations(&self, action: SyncAction) -> Vec<&Path> {
        self.events
            .iter()
            .filter(|(outcome, _)| outcome.action == action)
            .map(|(_, location)| location.as_path())
            .collect()
    }

    /// Outcomes that carry an error
    pub fn failures(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.events
            .iter()
            .map(|(outcome, _)| outcome)
            .filter(|outcome| outcome.failed())
    }
}

impl EventSink for RecordingSink {
    fn on_phase(&mut self, phase: SyncPhase) {
        self.phases.push(phase);
    }

    fn on_outcome(&mut self, outcome: &EntryOutcome, location: &Path) {
        self.events.push((outcome.clone(), location.to_path_buf()));
    }
}
