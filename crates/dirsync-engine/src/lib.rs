//! One-way directory synchronization for dirsync
//!
//! This crate mirrors a source directory tree into a target tree:
//!
//! - **Snapshots**: both roots are scanned into sorted trees of relative paths
//! - **Planning**: the two trees are diffed in merged order into forward steps
//!   (create directories, copy new or changed files) and cleanup steps
//!   (remove target entries absent from the source)
//! - **Execution**: steps run against a [`FileSystem`], and every action taken
//!   is reported as an [`EntryOutcome`](dirsync_types::EntryOutcome) to an
//!   [`EventSink`] and in the returned [`SyncReport`]
//!
//! Files are compared by size and modification time only; copied files get
//! the source modification time so the next run sees them as current.
//!
//! # Examples
//!
//! ```rust
//! use dirsync_engine::{MemoryFs, RecordingSink, SyncJob, Synchronizer};
//! use std::time::{Duration, SystemTime};
//!
//! let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
//! let mut fs = MemoryFs::new();
//! fs.add_file("/src/notes.txt", "hello", mtime)
//!     .add_file("/dst/stale.txt", "old", mtime);
//!
//! let job = SyncJob::new("/src", "/dst", true);
//! let mut sync = Synchronizer::new(&mut fs, RecordingSink::new());
//! let report = sync.run(&job).unwrap();
//!
//! assert!(report.is_clean());
//! assert_eq!(report.stats.files_copied, 1);
//! assert_eq!(report.stats.files_removed, 1);
//! assert!(fs.contains("/dst/notes.txt"));
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod copy;
pub mod diff;
pub mod engine;
pub mod fs;
pub mod identity;
pub mod memory;
pub mod sink;
pub mod tree;

pub use copy::copy_file;
pub use diff::{plan, CopyReason, ForwardStep, RemoveStep, SyncPlan};
pub use engine::{SyncJob, SyncOptions, SyncPhase, SyncReport, Synchronizer};
pub use fs::{FileSystem, LocalFs};
pub use identity::IdentityPolicy;
pub use memory::MemoryFs;
pub use sink::{EventSink, RecordingSink, TracingSink};
pub use tree::{scan_local, ScanError, TreeSnapshot};
