//! Sync planning
//!
//! Walks a source and a target snapshot side by side in pre-order and decides,
//! per relative path, what the forward pass and the cleanup pass must do. No
//! I/O happens here.

use crate::identity::IdentityPolicy;
use crate::tree::TreeSnapshot;
use dirsync_types::{EntryKind, FileRecord};
use std::cmp::Ordering;
use std::path::PathBuf;
use tracing::debug;

/// Why a file has to be copied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyReason {
    /// No entry at the target path
    Missing,
    /// Target file differs in size or modification time
    Changed,
}

/// One decision of the forward pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardStep {
    /// Directory absent from the target
    CreateDir {
        /// Relative path
        path: PathBuf,
    },
    /// File missing from or stale in the target
    Copy {
        /// Relative path
        path: PathBuf,
        /// Source size at scan time
        size: u64,
        /// Why the copy is needed
        reason: CopyReason,
    },
    /// Target file already matches
    UpToDate {
        /// Relative path
        path: PathBuf,
    },
    /// Source and target hold different kinds of entry at this path
    Conflict {
        /// Relative path
        path: PathBuf,
        /// Kind under the source root
        source_kind: EntryKind,
        /// Kind under the target root
        target_kind: EntryKind,
    },
    /// Source entry is neither a file nor a directory
    Unsupported {
        /// Relative path
        path: PathBuf,
    },
    /// Target entry, or a directory above it, could not be read or is not a
    /// directory, so nothing is written there
    Blocked {
        /// Relative path
        path: PathBuf,
    },
}

impl ForwardStep {
    /// Relative path the step applies to
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::CreateDir { path }
            | Self::Copy { path, .. }
            | Self::UpToDate { path }
            | Self::Conflict { path, .. }
            | Self::Unsupported { path }
            | Self::Blocked { path } => path,
        }
    }
}

/// Removal of a target-only entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveStep {
    /// Relative path
    pub path: PathBuf,
    /// Kind of the target entry
    pub kind: EntryKind,
}

/// Every decision for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    forward: Vec<ForwardStep>,
    cleanup: Vec<RemoveStep>,
}

impl SyncPlan {
    /// Forward steps in pre-order
    pub fn forward(&self) -> &[ForwardStep] {
        &self.forward
    }

    /// Removals, children before their parents
    pub fn cleanup(&self) -> &[RemoveStep] {
        &self.cleanup
    }

    /// Number of files that need copying
    pub fn copies(&self) -> usize {
        self.forward
            .iter()
            .filter(|s| matches!(s, ForwardStep::Copy { .. }))
            .count()
    }

    /// Whether the target already mirrors the source
    pub fn is_noop(&self) -> bool {
        self.cleanup.is_empty()
            && self
                .forward
                .iter()
                .all(|s| matches!(s, ForwardStep::UpToDate { .. }))
    }
}

/// Compare two snapshots and decide what to do
///
/// Removals are only planned when `delete_missing` is set, and never for a
/// path whose source entry, or any directory above it, failed to scan.
pub fn plan(
    source: &TreeSnapshot,
    target: &TreeSnapshot,
    identity: &IdentityPolicy,
    delete_missing: bool,
) -> SyncPlan {
    let mut plan = SyncPlan::default();
    let mut src = source.entries().peekable();
    let mut tgt = target.entries().peekable();

    loop {
        let order = match (src.peek(), tgt.peek()) {
            (Some(s), Some(t)) => s.path.cmp(&t.path),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };

        match order {
            Ordering::Less => {
                if let Some(s) = src.next() {
                    plan.forward.push(source_only(s, target));
                }
            }
            Ordering::Greater => {
                if let Some(t) = tgt.next() {
                    if delete_missing && !source.is_shadowed(&t.path) {
                        plan.cleanup.push(RemoveStep {
                            path: t.path.clone(),
                            kind: t.kind,
                        });
                    }
                }
            }
            Ordering::Equal => {
                if let (Some(s), Some(t)) = (src.next(), tgt.next()) {
                    if let Some(step) = on_both_sides(s, t, identity) {
                        plan.forward.push(step);
                    }
                }
            }
        }
    }

    // Pre-order reversed: every entry comes before the directory holding it
    plan.cleanup.reverse();

    debug!(
        "Planned {} forward steps ({} copies) and {} removals",
        plan.forward.len(),
        plan.copies(),
        plan.cleanup.len()
    );
    plan
}

fn source_only(s: &FileRecord, target: &TreeSnapshot) -> ForwardStep {
    let path = s.path.clone();
    match s.kind {
        EntryKind::Other => ForwardStep::Unsupported { path },
        _ if target.is_shadowed(&s.path) || target.is_below_non_dir(&s.path) => {
            ForwardStep::Blocked { path }
        }
        EntryKind::Directory => ForwardStep::CreateDir { path },
        EntryKind::File => ForwardStep::Copy {
            path,
            size: s.size,
            reason: CopyReason::Missing,
        },
    }
}

fn on_both_sides(s: &FileRecord, t: &FileRecord, identity: &IdentityPolicy) -> Option<ForwardStep> {
    let path = s.path.clone();
    match (s.kind, t.kind) {
        (EntryKind::Other, _) => Some(ForwardStep::Unsupported { path }),
        (EntryKind::Directory, EntryKind::Directory) => None,
        (EntryKind::File, EntryKind::File) if identity.same_file(s, t) => {
            Some(ForwardStep::UpToDate { path })
        }
        (EntryKind::File, EntryKind::File) => Some(ForwardStep::Copy {
            path,
            size: s.size,
            reason: CopyReason::Changed,
        }),
        (source_kind, target_kind) => Some(ForwardStep::Conflict {
            path,
            source_kind,
            target_kind,
        }),
    }
}
