//! Core data types for dirsync
//!
//! Records describing the entries a sync run compares, and the outcomes it
//! reports for the entries it acted on.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::Error;

/// File size in bytes
pub type FileSize = u64;

/// Transfer rate in bytes per second
pub type TransferRate = f64;

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntryKind {
    /// Directory
    Directory,
    /// Regular file (or a link resolving to one)
    File,
    /// Anything else: sockets, devices, links to directories
    Other,
}

impl EntryKind {
    /// Whether this is a directory
    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }

    /// Whether this is a regular file
    pub fn is_file(self) -> bool {
        self == Self::File
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Directory => "directory",
            Self::File => "file",
            Self::Other => "special file",
        };
        f.write_str(name)
    }
}

/// One entry of a scanned tree
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileRecord {
    /// Path relative to the scanned root; empty for the root itself
    pub path: PathBuf,
    /// Entry kind
    pub kind: EntryKind,
    /// Size in bytes (zero for directories)
    pub size: FileSize,
    /// Last modification time
    pub modified: SystemTime,
}

impl FileRecord {
    /// Create a file record
    pub fn file(path: impl Into<PathBuf>, size: FileSize, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
            size,
            modified,
        }
    }

    /// Create a directory record
    pub fn directory(path: impl Into<PathBuf>, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
            size: 0,
            modified,
        }
    }

    /// Whether this record is the scanned root
    pub fn is_root(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

/// Action taken (or attempted) on one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SyncAction {
    /// A directory was created in the target
    CreateDir,
    /// A file was copied into the target
    CopyFile,
    /// A target-only file was removed
    RemoveFile,
    /// A target-only directory was removed
    RemoveDir,
    /// An entry could not be read or compared
    Access,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateDir => "create-dir",
            Self::CopyFile => "copy-file",
            Self::RemoveFile => "remove-file",
            Self::RemoveDir => "remove-dir",
            Self::Access => "access",
        };
        f.write_str(name)
    }
}

/// Result of acting on one entry
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntryOutcome {
    /// Path relative to the root the action applied to
    pub path: PathBuf,
    /// Action taken
    pub action: SyncAction,
    /// Error, if the action failed
    pub error: Option<Error>,
}

impl EntryOutcome {
    /// Create a successful outcome
    pub fn ok(path: impl Into<PathBuf>, action: SyncAction) -> Self {
        Self {
            path: path.into(),
            action,
            error: None,
        }
    }

    /// Create a failed outcome
    pub fn err(path: impl Into<PathBuf>, action: SyncAction, error: Error) -> Self {
        Self {
            path: path.into(),
            action,
            error: Some(error),
        }
    }

    /// Whether the action succeeded
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the action failed
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }

    /// Relative path as a `Path`
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Aggregate statistics for a sync run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SyncStats {
    /// Directories created in the target
    pub dirs_created: u64,
    /// Files copied into the target
    pub files_copied: u64,
    /// Bytes copied into the target
    pub bytes_copied: u64,
    /// Files found identical and left alone
    pub files_unchanged: u64,
    /// Target-only files removed
    pub files_removed: u64,
    /// Target-only directories removed
    pub dirs_removed: u64,
    /// Target-only directories kept because they still had content
    pub dirs_retained: u64,
    /// Per-entry failures
    pub errors: u64,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl SyncStats {
    /// Create a new empty statistics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one outcome; `bytes` is only credited to successful copies
    pub fn record(&mut self, outcome: &EntryOutcome, bytes: FileSize) {
        if outcome.failed() {
            self.errors += 1;
            return;
        }
        match outcome.action {
            SyncAction::CreateDir => self.dirs_created += 1,
            SyncAction::CopyFile => {
                self.files_copied += 1;
                self.bytes_copied += bytes;
            }
            SyncAction::RemoveFile => self.files_removed += 1,
            SyncAction::RemoveDir => self.dirs_removed += 1,
            SyncAction::Access => {}
        }
    }

    /// Number of changes made to the target
    pub fn total_changes(&self) -> u64 {
        self.dirs_created + self.files_copied + self.files_removed + self.dirs_removed
    }

    /// Calculate the overall transfer rate
    pub fn transfer_rate(&self) -> TransferRate {
        if self.duration.as_secs_f64() > 0.0 {
            self.bytes_copied as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Merge statistics from another instance
    pub fn merge(&mut self, other: &Self) {
        self.dirs_created += other.dirs_created;
        self.files_copied += other.files_copied;
        self.bytes_copied += other.bytes_copied;
        self.files_unchanged += other.files_unchanged;
        self.files_removed += other.files_removed;
        self.dirs_removed += other.dirs_removed;
        self.dirs_retained += other.dirs_retained;
        self.errors += other.errors;
        self.duration += other.duration;
    }
}
