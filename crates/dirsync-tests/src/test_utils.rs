//! Helpers for building directory trees on disk

use filetime::FileTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use walkdir::WalkDir;

/// A source and a target directory inside one temporary directory
pub struct SyncFixture {
    temp_dir: TempDir,
}

impl SyncFixture {
    /// Create `source/` and `target/` under a fresh temporary directory
    pub fn new() -> io::Result<Self> {
        let temp_dir = TempDir::new()?;
        fs::create_dir(temp_dir.path().join("source"))?;
        fs::create_dir(temp_dir.path().join("target"))?;
        Ok(Self { temp_dir })
    }

    /// Source root
    pub fn source(&self) -> PathBuf {
        self.temp_dir.path().join("source")
    }

    /// Target root
    pub fn target(&self) -> PathBuf {
        self.temp_dir.path().join("target")
    }

    /// Path of a location inside the temporary directory but outside both roots
    pub fn outside(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}

/// A fixed point in time, `secs` after the epoch
pub fn timestamp(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

/// Write a file, creating its parents, and set its modification time
pub fn write_file_with_mtime(
    path: &Path,
    contents: impl AsRef<[u8]>,
    modified: SystemTime,
) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    filetime::set_file_mtime(path, FileTime::from_system_time(modified))
}

/// Modification time of a file
pub fn mtime(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// Every path below `root`, relative to it, in pre-order
pub fn list_tree(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if let Ok(relative) = entry.path().strip_prefix(root) {
            out.push(relative.to_path_buf());
        }
    }
    Ok(out)
}

/// Populate `root` with `count` files spread over a few subdirectories
///
/// Contents are deterministic so repeated benchmark runs see the same tree.
pub fn create_tree(root: &Path, count: usize, file_size: usize) -> io::Result<()> {
    for i in 0..count {
        let path = root.join(format!("dir{}", i % 10)).join(format!("file{i}.txt"));
        let data: Vec<u8> = (0..file_size).map(|j| ((i * 7 + j * 13) % 256) as u8).collect();
        write_file_with_mtime(&path, data, timestamp(1_600_000_000 + i as u64))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tree_layout() {
        let fixture = SyncFixture::new().unwrap();
        create_tree(&fixture.source(), 12, 8).unwrap();

        let paths = list_tree(&fixture.source()).unwrap();
        let files = paths.iter().filter(|p| p.extension().is_some()).count();

        assert_eq!(files, 12);
        assert!(paths.contains(&PathBuf::from("dir1/file11.txt")));
        assert_eq!(
            mtime(&fixture.source().join("dir0/file0.txt")).unwrap(),
            timestamp(1_600_000_000)
        );
    }
}
