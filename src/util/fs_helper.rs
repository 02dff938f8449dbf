use std::fs;
use std::io::{self, Write};
use std::path::Path;

use spdlog::debug;
use tempfile::NamedTempFile;

/// Writes `contents` to a temporary file in the same directory as `path`
/// and persists it over `path`, so readers never see a partial file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    // Dropped without persisting means removed.
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Moves a file, replacing the destination. Falls back to copy + remove
/// when a rename is not possible (e.g. across file systems). The
/// destination is only touched once the source is known to be movable.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            if !from.is_file() {
                return Err(e);
            }
            debug!("Rename {} -> {} failed ({}), copying instead", from.display(), to.display(), e);
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
