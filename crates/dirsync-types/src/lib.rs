//! Core type system and error handling for dirsync
//!
//! This crate provides the foundational types shared by the dirsync crates:
//!
//! - **Error handling**: a single error taxonomy that separates fatal root failures
//!   from per-entry problems that a sync run records and steps over
//! - **Records**: the per-entry file records compared during a sync
//! - **Outcomes**: the per-entry action results a run reports back to its caller
//!
//! # Features
//!
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use dirsync_types::{EntryOutcome, SyncAction, SyncStats};
//!
//! let outcome = EntryOutcome::ok("docs/readme.md", SyncAction::CopyFile);
//! let mut stats = SyncStats::new();
//! stats.record(&outcome, 42);
//! assert_eq!(stats.files_copied, 1);
//! assert_eq!(stats.bytes_copied, 42);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use result::Result;
pub use types::*;
