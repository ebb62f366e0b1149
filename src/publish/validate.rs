//! Structural check of a map archive before anything is sent to the remote.

use std::path::Path;

use tracing::debug;

use crate::core::{LauncherError, Result};
use crate::install::archive::{MapLayout, entry_names, map_layout};

/// Accept `path` only if it is a ZIP holding a world save.
///
/// A world save has `level.dat` and a `region/` directory, either at the
/// archive root or inside exactly one top-level folder.
pub fn validate_map_archive(path: &Path) -> Result<MapLayout> {
    let invalid = |reason: String| LauncherError::InvalidMapArchive {
        path: path.display().to_string(),
        reason,
    };

    if !path.is_file() {
        return Err(invalid("file does not exist".to_string()));
    }
    let names = entry_names(path).map_err(|e| match e {
        LauncherError::Install { reason, .. } => invalid(reason),
        other => other,
    })?;
    if names.is_empty() {
        return Err(invalid("archive is empty".to_string()));
    }

    let layout = map_layout(&names).ok_or_else(|| {
        invalid(
            "expected level.dat and a region/ folder at the root or inside a single top-level folder"
                .to_string(),
        )
    })?;
    debug!("Map archive {} has layout {:?}", path.display(), layout);
    Ok(layout)
}
