//! Crash-safe document replacement.
//!
//! The worker re-reads the rule configuration on every request, so the host
//! must never leave it half written. Bytes land in a sibling temp file that
//! is synced and then renamed over the target.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Replace `path` with `bytes`, creating missing parent directories.
pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    sync_dir(dir);

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Replaced document");
    Ok(())
}

/// Persist the rename itself. Failure only costs durability across power
/// loss, so it is logged and ignored.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), "Directory sync failed: {e}");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
