//! Directory management.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

use crate::core::{LauncherError, Result};

/// Create `path` and its parents. Fails if it exists as a file.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    if path.exists() {
        return Err(LauncherError::io(
            path,
            std::io::Error::new(ErrorKind::AlreadyExists, "path exists but is not a directory"),
        ));
    }
    fs::create_dir_all(path).map_err(|e| LauncherError::io(path, e))
}

/// Remove `path` if it is an empty directory. Returns whether it was removed.
pub fn remove_dir_if_empty(path: &Path) -> Result<bool> {
    let mut entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(LauncherError::io(path, e)),
    };
    if entries.next().is_some() {
        return Ok(false);
    }
    fs::remove_dir(path).map_err(|e| LauncherError::io(path, e))?;
    debug!("Removed empty directory {}", path.display());
    Ok(true)
}

/// Best-effort removal of a file or directory tree; failures are logged.
pub fn remove_quietly(path: &Path) {
    let result = if path.is_dir() { fs::remove_dir_all(path) } else { fs::remove_file(path) };
    match result {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {}", path.display(), e),
    }
}

/// Move a file, falling back to copy-and-delete across file systems.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).map_err(|e| LauncherError::io(to, e))?;
    fs::remove_file(from).map_err(|e| LauncherError::io(from, e))
}

/// Add execute permission for everyone (no-op on Windows).
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = fs::metadata(path).map_err(|e| LauncherError::io(path, e))?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(permissions.mode() | 0o755);
        fs::set_permissions(path, permissions).map_err(|e| LauncherError::io(path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
