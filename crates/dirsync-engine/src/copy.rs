//! File copy primitive

use dirsync_types::{Error, Result};
use filetime::FileTime;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::trace;

/// Copy `source` to `target`, preserving the source modification time
///
/// Missing parent directories of `target` are created. The target is
/// truncated and rewritten in place, so a failure part way through can leave
/// a short file behind; the next run sees the size mismatch and copies again.
/// The modification time is read from the source after the content has been
/// streamed, not taken from an earlier scan.
pub fn copy_file(source: &Path, target: &Path) -> Result<u64> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
    }

    let bytes = {
        let mut reader = File::open(source).map_err(|e| Error::io_at(source, e))?;
        let mut writer = File::create(target).map_err(|e| Error::io_at(target, e))?;
        io::copy(&mut reader, &mut writer).map_err(|e| Error::io_at(target, e))?
    };

    let modified = fs::metadata(source)
        .and_then(|m| m.modified())
        .map_err(|e| Error::io_at(source, e))?;
    let mtime = FileTime::from_system_time(modified);
    filetime::set_file_times(target, mtime, mtime).map_err(|e| Error::Timestamp {
        path: target.to_path_buf(),
        message: e.to_string(),
    })?;

    trace!("Copied {} bytes: {} -> {}", bytes, source.display(), target.display());
    Ok(bytes)
}
