//! In-memory filesystem
//!
//! Holds a tree of directories and files with explicit modification times,
//! and lets callers make individual operations fail. Paths are used as
//! given; nothing is canonicalised.

use crate::fs::FileSystem;
use crate::tree::TreeSnapshot;
use dirsync_types::{EntryKind, Error, FileRecord, Result};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone)]
enum Node {
    Dir { modified: SystemTime },
    File { data: Vec<u8>, modified: SystemTime },
}

impl Node {
    fn kind(&self) -> EntryKind {
        match self {
            Self::Dir { .. } => EntryKind::Directory,
            Self::File { .. } => EntryKind::File,
        }
    }

    fn modified(&self) -> SystemTime {
        match self {
            Self::Dir { modified } | Self::File { modified, .. } => *modified,
        }
    }
}

/// A filesystem that lives in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    nodes: BTreeMap<PathBuf, Node>,
    unreadable: HashSet<PathBuf>,
    failing_dirs: HashSet<PathBuf>,
    failing_copies: HashSet<PathBuf>,
    failing_removals: HashSet<PathBuf>,
}

impl MemoryFs {
    /// Create an empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory and any missing ancestors
    pub fn add_dir<P: AsRef<Path>>(&mut self, path: P) -> &mut Self {
        self.make_dirs(path.as_ref());
        self
    }

    /// Add a file with the given content and modification time, creating its
    /// ancestors; an existing file at `path` is replaced
    pub fn add_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        data: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) -> &mut Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.make_dirs(parent);
        }
        self.nodes.insert(
            path.to_path_buf(),
            Node::File {
                data: data.into(),
                modified,
            },
        );
        self
    }

    /// Make listing `dir` fail; `dir` itself stays visible
    pub fn deny_read<P: AsRef<Path>>(&mut self, dir: P) -> &mut Self {
        self.unreadable.insert(dir.as_ref().to_path_buf());
        self
    }

    /// Make creating the directory `dir` fail, along with anything that
    /// needs it created first
    pub fn fail_create_dir<P: AsRef<Path>>(&mut self, dir: P) -> &mut Self {
        self.failing_dirs.insert(dir.as_ref().to_path_buf());
        self
    }

    /// Make copies onto `target` fail
    pub fn fail_copy<P: AsRef<Path>>(&mut self, target: P) -> &mut Self {
        self.failing_copies.insert(target.as_ref().to_path_buf());
        self
    }

    /// Make removing `path` fail
    pub fn fail_remove<P: AsRef<Path>>(&mut self, path: P) -> &mut Self {
        self.failing_removals.insert(path.as_ref().to_path_buf());
        self
    }

    /// File content, if `path` is a file
    pub fn read<P: AsRef<Path>>(&self, path: P) -> Option<&[u8]> {
        match self.nodes.get(path.as_ref()) {
            Some(Node::File { data, .. }) => Some(data.as_slice()),
            _ => None,
        }
    }

    /// Modification time of any entry
    pub fn modified<P: AsRef<Path>>(&self, path: P) -> Option<SystemTime> {
        self.nodes.get(path.as_ref()).map(Node::modified)
    }

    /// Whether `path` is a directory
    pub fn is_dir<P: AsRef<Path>>(&self, path: P) -> bool {
        matches!(self.nodes.get(path.as_ref()), Some(Node::Dir { .. }))
    }

    /// Whether anything exists at `path`
    pub fn contains<P: AsRef<Path>>(&self, path: P) -> bool {
        self.nodes.contains_key(path.as_ref())
    }

    /// Every path strictly below `root`, relative to it, in pre-order
    pub fn paths_under<P: AsRef<Path>>(&self, root: P) -> Vec<PathBuf> {
        let root = root.as_ref();
        self.descendants(root)
            .filter_map(|(path, _)| path.strip_prefix(root).ok())
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .collect()
    }

    fn descendants<'a>(&'a self, root: &'a Path) -> impl Iterator<Item = (&'a PathBuf, &'a Node)> {
        self.nodes
            .range(root.to_path_buf()..)
            .take_while(move |(path, _)| path.starts_with(root))
    }

    fn make_dirs(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() || self.nodes.contains_key(ancestor) {
                continue;
            }
            self.nodes.insert(
                ancestor.to_path_buf(),
                Node::Dir {
                    modified: SystemTime::UNIX_EPOCH,
                },
            );
        }
    }

    fn has_children(&self, path: &Path) -> bool {
        self.descendants(path).any(|(p, _)| p != path)
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file or directory", path.display()),
    )
}

fn injected(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("{}: permission denied", path.display()),
    )
}

impl FileSystem for MemoryFs {
    fn scan(&self, root: &Path, _follow_symlinks: bool) -> io::Result<TreeSnapshot> {
        match self.nodes.get(root) {
            None => return Err(not_found(root)),
            Some(Node::File { .. }) => {
                return Err(io::Error::other(format!(
                    "'{}' is not a directory",
                    root.display()
                )))
            }
            Some(Node::Dir { .. }) if self.unreadable.contains(root) => {
                return Err(injected(root))
            }
            Some(Node::Dir { .. }) => {}
        }

        let mut snapshot = TreeSnapshot::new(root);
        let mut hidden: Vec<&Path> = Vec::new();

        for (path, node) in self.descendants(root) {
            if hidden.iter().any(|dir| path.starts_with(dir)) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            snapshot.insert(FileRecord {
                path: relative.to_path_buf(),
                kind: node.kind(),
                size: match node {
                    Node::File { data, .. } => data.len() as u64,
                    Node::Dir { .. } => 0,
                },
                modified: node.modified(),
            });
            if self.unreadable.contains(path) {
                snapshot.push_error(relative.to_path_buf(), Error::io_at(path, injected(path)));
                hidden.push(path);
            }
        }

        Ok(snapshot)
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        Ok(self.nodes.contains_key(path))
    }

    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        if let Some(file) = path
            .ancestors()
            .find(|a| matches!(self.nodes.get(*a), Some(Node::File { .. })))
        {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{}: file exists", file.display()),
            ));
        }
        if let Some(dir) = path
            .ancestors()
            .find(|a| self.failing_dirs.contains(*a) && !self.nodes.contains_key(*a))
        {
            return Err(injected(dir));
        }
        self.make_dirs(path);
        Ok(())
    }

    fn copy_file(&mut self, source: &Path, target: &Path) -> Result<u64> {
        let (data, modified) = match self.nodes.get(source) {
            Some(Node::File { data, modified }) => (data.clone(), *modified),
            Some(Node::Dir { .. }) => {
                return Err(Error::io_at(source, "is a directory"));
            }
            None => return Err(Error::io_at(source, not_found(source))),
        };

        if let Some(parent) = target.parent() {
            self.create_dir_all(parent)
                .map_err(|e| Error::io_at(parent, e))?;
        }
        if self.failing_copies.contains(target) {
            return Err(Error::io_at(target, injected(target)));
        }
        if self.is_dir(target) {
            return Err(Error::io_at(target, "is a directory"));
        }

        let bytes = data.len() as u64;
        self.nodes
            .insert(target.to_path_buf(), Node::File { data, modified });
        Ok(bytes)
    }

    fn remove_file(&mut self, path: &Path) -> io::Result<()> {
        if self.failing_removals.contains(path) {
            return Err(injected(path));
        }
        match self.nodes.get(path) {
            Some(Node::File { .. }) => {
                self.nodes.remove(path);
                Ok(())
            }
            Some(Node::Dir { .. }) => Err(io::Error::other(format!(
                "{}: is a directory",
                path.display()
            ))),
            None => Err(not_found(path)),
        }
    }

    fn remove_dir(&mut self, path: &Path) -> io::Result<()> {
        if self.failing_removals.contains(path) {
            return Err(injected(path));
        }
        match self.nodes.get(path) {
            Some(Node::Dir { .. }) if self.has_children(path) => Err(io::Error::other(format!(
                "{}: directory not empty",
                path.display()
            ))),
            Some(Node::Dir { .. }) => {
                self.nodes.remove(path);
                Ok(())
            }
            Some(Node::File { .. }) => Err(io::Error::other(format!(
                "{}: not a directory",
                path.display()
            ))),
            None => Err(not_found(path)),
        }
    }
}
