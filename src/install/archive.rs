//! ZIP archive inspection and extraction.
//!
//! Extraction refuses the whole archive if any entry would land outside the
//! target directory (absolute paths, `..` components), before writing a
//! single file.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::core::{LauncherError, Result};

/// Where the world data sits inside a map archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapLayout {
    /// `level.dat` and `region/` at the archive root
    Root,
    /// Both inside the single top-level folder named here
    Nested(String),
}

fn open(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path).map_err(|e| LauncherError::io(path, e))?;
    ZipArchive::new(file).map_err(|e| LauncherError::Install {
        artifact: path.display().to_string(),
        reason: format!("not a valid ZIP archive: {e}"),
    })
}

/// Entry names with directory markers normalised to forward slashes.
pub fn entry_names(path: &Path) -> Result<Vec<String>> {
    let archive = open(path)?;
    Ok(archive.file_names().map(|n| n.replace('\\', "/")).collect())
}

/// Distinct first path components of the archive entries.
#[must_use]
pub fn top_level_names(names: &[String]) -> BTreeSet<String> {
    names
        .iter()
        .filter_map(|n| n.trim_start_matches("./").split('/').next())
        .filter(|first| !first.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Locate the world save inside a map archive.
///
/// Returns `None` when neither layout matches.
#[must_use]
pub fn map_layout(names: &[String]) -> Option<MapLayout> {
    let has_world_at = |prefix: &str| {
        let level = format!("{prefix}level.dat");
        let region = format!("{prefix}region/");
        names.iter().any(|n| *n == level) && names.iter().any(|n| n.starts_with(&region))
    };

    if has_world_at("") {
        return Some(MapLayout::Root);
    }

    let tops = top_level_names(names);
    if tops.len() != 1 {
        return None;
    }
    let top = tops.into_iter().next()?;
    let prefix = format!("{top}/");
    let is_folder = names.iter().all(|n| n.starts_with(&prefix) || *n == top);
    (is_folder && has_world_at(&prefix)).then_some(MapLayout::Nested(top))
}

/// Extract `archive` into `target`, returning the top-level paths created.
pub fn extract(archive: &Path, target: &Path) -> Result<Vec<PathBuf>> {
    let mut zip = open(archive)?;
    let artifact = archive.display().to_string();

    let mut planned = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let entry = zip.by_index(index).map_err(|e| LauncherError::Install {
            artifact: artifact.clone(),
            reason: e.to_string(),
        })?;
        let relative = entry.enclosed_name().ok_or_else(|| LauncherError::Install {
            artifact: artifact.clone(),
            reason: format!("entry '{}' escapes the target directory", entry.name()),
        })?;
        planned.push((index, relative, entry.is_dir()));
    }

    fs::create_dir_all(target).map_err(|e| LauncherError::io(target, e))?;
    let mut tops = BTreeSet::new();
    for (index, relative, is_dir) in planned {
        if let Some(first) = relative.components().next() {
            tops.insert(target.join(first.as_os_str()));
        }
        let out = target.join(&relative);
        if is_dir {
            fs::create_dir_all(&out).map_err(|e| LauncherError::io(&out, e))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut entry = zip.by_index(index).map_err(|e| LauncherError::Install {
            artifact: artifact.clone(),
            reason: e.to_string(),
        })?;
        let mut file = File::create(&out).map_err(|e| LauncherError::io(&out, e))?;
        io::copy(&mut entry, &mut file).map_err(|e| LauncherError::io(&out, e))?;
    }

    debug!("Extracted {} into {}", archive.display(), target.display());
    Ok(tops.into_iter().collect())
}
