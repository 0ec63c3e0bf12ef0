//! File identity predicate
//!
//! Two files are treated as the same file, and therefore not recopied, when
//! their sizes match and their modification times agree. Content is never
//! hashed.

use dirsync_types::FileRecord;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Decides whether a target file is a current copy of a source file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPolicy {
    mtime_tolerance: Duration,
}

impl IdentityPolicy {
    /// Exact modification time equality
    pub const fn exact() -> Self {
        Self {
            mtime_tolerance: Duration::ZERO,
        }
    }

    /// Accept modification times up to `tolerance` apart, for filesystems
    /// that store coarser timestamps than the source
    pub const fn with_tolerance(tolerance: Duration) -> Self {
        Self {
            mtime_tolerance: tolerance,
        }
    }

    /// Allowed modification time difference
    pub fn tolerance(&self) -> Duration {
        self.mtime_tolerance
    }

    /// Size equal and modification time within tolerance
    pub fn same_file(&self, source: &FileRecord, target: &FileRecord) -> bool {
        source.size == target.size
            && mtime_distance(source.modified, target.modified) <= self.mtime_tolerance
    }
}

fn mtime_distance(a: SystemTime, b: SystemTime) -> Duration {
    a.duration_since(b).unwrap_or_else(|e| e.duration())
}
