//! Directory tree snapshots
//!
//! A snapshot records every entry under a root keyed by its path relative to
//! that root. `BTreeMap` orders `PathBuf` keys component by component, so
//! iteration is a depth-first pre-order walk: a directory always comes before
//! anything inside it.

use dirsync_types::{EntryKind, Error, FileRecord};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// A per-entry problem met while scanning a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    /// Path relative to the scanned root
    pub path: PathBuf,
    /// What went wrong
    pub error: Error,
}

/// Entries found under one root
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    root: PathBuf,
    entries: BTreeMap<PathBuf, FileRecord>,
    errors: Vec<ScanError>,
}

impl TreeSnapshot {
    /// Create an empty snapshot for `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            entries: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    /// Add a record, replacing any previous record at the same path
    pub fn insert(&mut self, record: FileRecord) {
        self.entries.insert(record.path.clone(), record);
    }

    /// Note an entry that could not be read
    pub fn push_error(&mut self, path: PathBuf, error: Error) {
        self.errors.push(ScanError { path, error });
    }

    /// Scanned root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record at a relative path
    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.entries.get(path)
    }

    /// Whether a relative path was found
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Records in pre-order
    pub fn entries(&self) -> impl Iterator<Item = &FileRecord> {
        self.entries.values()
    }

    /// Entries that could not be read
    pub fn errors(&self) -> &[ScanError] {
        &self.errors
    }

    /// Whether reading this exact relative path failed
    pub fn has_error(&self, path: &Path) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }

    /// Whether this path, or a directory above it, failed to read
    pub fn is_shadowed(&self, path: &Path) -> bool {
        self.errors.iter().any(|e| path.starts_with(&e.path))
    }

    /// Whether a directory above this path was found as something else
    pub fn is_below_non_dir(&self, path: &Path) -> bool {
        path.ancestors()
            .skip(1)
            .any(|dir| self.get(dir).is_some_and(|r| !r.kind.is_dir()))
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no records were found
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Absolute location of a relative path under this snapshot's root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        resolve(&self.root, path)
    }
}

/// Map a relative path onto a root; the empty path is the root itself
pub fn resolve(root: &Path, relative: &Path) -> PathBuf {
    if relative.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(relative)
    }
}

/// Scan a local directory tree
///
/// Fails only when the walk cannot start: `root` is missing, is not a
/// directory, or cannot be listed. Anything that goes wrong further down is
/// recorded in the snapshot and the walk carries on.
pub fn scan_local(root: &Path, follow_symlinks: bool) -> io::Result<TreeSnapshot> {
    let metadata = std::fs::metadata(root)?;
    if !metadata.is_dir() {
        return Err(io::Error::other(format!(
            "'{}' is not a directory",
            root.display()
        )));
    }

    let mut snapshot = TreeSnapshot::new(root);
    let walker = WalkDir::new(root)
        .follow_links(follow_symlinks)
        .sort_by_file_name();

    for entry in walker {
        match entry {
            Ok(entry) => {
                let relative = relative_to(root, entry.path());
                match record_for(&entry, relative.clone()) {
                    Ok(record) => snapshot.insert(record),
                    Err(e) => {
                        debug!("Cannot stat {}: {}", entry.path().display(), e);
                        snapshot.push_error(relative, Error::io_at(entry.path(), e));
                    }
                }
            }
            Err(err) if err.depth() == 0 => return Err(err.into()),
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                debug!("Cannot access {}: {}", path.display(), err);
                snapshot.push_error(relative_to(root, &path), Error::io_at(&path, err));
            }
        }
    }

    debug!(
        "Scanned {} entries ({} unreadable) in '{}'",
        snapshot.len(),
        snapshot.errors().len(),
        root.display()
    );
    Ok(snapshot)
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

fn record_for(entry: &DirEntry, path: PathBuf) -> io::Result<FileRecord> {
    // A link that was not followed is classified by what it points at;
    // a dangling link is kept as the link itself
    let metadata = if entry.path_is_symlink() {
        match std::fs::metadata(entry.path()) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                std::fs::symlink_metadata(entry.path())?
            }
            Err(e) => return Err(e),
        }
    } else {
        entry.metadata().map_err(io::Error::from)?
    };

    let kind = if entry.file_type().is_dir() {
        EntryKind::Directory
    } else if metadata.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    };
    let size = if kind == EntryKind::File { metadata.len() } else { 0 };

    Ok(FileRecord {
        path,
        kind,
        size,
        modified: metadata.modified()?,
    })
}
