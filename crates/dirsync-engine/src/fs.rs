//! Filesystem access used by the synchronizer
//!
//! Everything the synchronizer does to disk goes through [`FileSystem`], so a
//! run can be pointed at the real filesystem ([`LocalFs`]) or at an in-memory
//! tree ([`crate::MemoryFs`]).

use crate::copy;
use crate::tree::{self, TreeSnapshot};
use dirsync_types::Result;
use std::fs;
use std::io;
use std::path::Path;

/// Operations a sync run needs from a filesystem
pub trait FileSystem {
    /// Snapshot the tree under `root`; errors only if the walk cannot start
    fn scan(&self, root: &Path, follow_symlinks: bool) -> io::Result<TreeSnapshot>;

    /// Whether anything exists at `path`, without following a final symlink
    fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Create a directory and any missing ancestors
    fn create_dir_all(&mut self, path: &Path) -> io::Result<()>;

    /// Copy one file, preserving its modification time; returns bytes written
    fn copy_file(&mut self, source: &Path, target: &Path) -> Result<u64>;

    /// Remove a file
    fn remove_file(&mut self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory
    fn remove_dir(&mut self, path: &Path) -> io::Result<()>;
}

impl<F: FileSystem + ?Sized> FileSystem for &mut F {
    fn scan(&self, root: &Path, follow_symlinks: bool) -> io::Result<TreeSnapshot> {
        (**self).scan(root, follow_symlinks)
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        (**self).exists(path)
    }

    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        (**self).create_dir_all(path)
    }

    fn copy_file(&mut self, source: &Path, target: &Path) -> Result<u64> {
        (**self).copy_file(source, target)
    }

    fn remove_file(&mut self, path: &Path) -> io::Result<()> {
        (**self).remove_file(path)
    }

    fn remove_dir(&mut self, path: &Path) -> io::Result<()> {
        (**self).remove_dir(path)
    }
}

/// The host filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn scan(&self, root: &Path, follow_symlinks: bool) -> io::Result<TreeSnapshot> {
        tree::scan_local(root, follow_symlinks)
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                // Nothing can exist below a file
                for ancestor in path.ancestors().skip(1) {
                    if let Ok(metadata) = fs::metadata(ancestor) {
                        return if metadata.is_dir() { Err(e) } else { Ok(false) };
                    }
                }
                Err(e)
            }
        }
    }

    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn copy_file(&mut self, source: &Path, target: &Path) -> Result<u64> {
        copy::copy_file(source, target)
    }

    fn remove_file(&mut self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir(&mut self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }
}
