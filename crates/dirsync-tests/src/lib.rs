//! dirsync test suite
//!
//! Integration tests that run full synchronizations against real temporary
//! directories, and benchmarks for trees of different sizes.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Shared helpers for building source and target trees on disk
pub mod test_utils;
