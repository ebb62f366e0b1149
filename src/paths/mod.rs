//! Game directory resolution.
//!
//! Installers need three directories under the game root: `mods`, `saves`
//! and `resourcepacks`. [`GamePaths::resolve`] produces them (creating any
//! that are missing) from a root directory, or `None` when the root is not a
//! usable directory.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::{LauncherError, Result};
use crate::utils::fs::ensure_dir;

/// Absolute game directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamePaths {
    /// Game root
    pub root: PathBuf,
    /// Mod jars
    pub mods: PathBuf,
    /// World saves
    pub saves: PathBuf,
    /// Resource packs
    pub resourcepacks: PathBuf,
}

impl GamePaths {
    /// Directories under `root`, created when missing.
    ///
    /// Returns `Ok(None)` when `root` does not exist or is not a directory.
    pub fn resolve(root: &Path) -> Result<Option<Self>> {
        let expanded = PathBuf::from(shellexpand::tilde(&root.to_string_lossy()).as_ref());
        if !expanded.is_dir() {
            debug!("Game root {} is not a directory", expanded.display());
            return Ok(None);
        }
        let root = std::path::absolute(&expanded).map_err(|e| LauncherError::io(&expanded, e))?;

        let paths = Self {
            mods: root.join("mods"),
            saves: root.join("saves"),
            resourcepacks: root.join("resourcepacks"),
            root,
        };
        for dir in [&paths.mods, &paths.saves, &paths.resourcepacks] {
            ensure_dir(dir)?;
        }
        Ok(Some(paths))
    }

    /// Like [`resolve`](Self::resolve), but a missing root is an error naming
    /// the directory that was needed.
    pub fn require(root: Option<&Path>, needed: &str) -> Result<Self> {
        let missing = || LauncherError::MissingDirectory {
            name: needed.to_string(),
        };
        let root = root.ok_or_else(missing)?;
        Self::resolve(root)?.ok_or_else(missing)
    }
}

/// Platform default game root: `%APPDATA%\.minecraft`,
/// `~/Library/Application Support/minecraft` or `~/.minecraft`.
#[must_use]
pub fn default_minecraft_dir() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        dirs::config_dir().map(|appdata| appdata.join(".minecraft"))
    } else if cfg!(target_os = "macos") {
        dirs::home_dir().map(|home| home.join("Library").join("Application Support").join("minecraft"))
    } else {
        dirs::home_dir().map(|home| home.join(".minecraft"))
    }
}
