//! Atomic file write operations using temp-and-rename strategy.
//!
//! A reader never observes a half-written file: content goes to a sibling
//! temporary file which is synced and then renamed over the target.

use std::fs;
use std::io::Write;
use std::path::Path;

use super::dirs::ensure_dir;
use crate::core::{LauncherError, Result};

/// Write a UTF-8 string atomically.
pub fn safe_write(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Write bytes atomically, creating parent directories as needed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    let temp_path = path.with_file_name(temp_name);

    let written = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(LauncherError::io(&temp_path, e));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        LauncherError::io(path, e)
    })
}
