//! Remote map publishing and deletion.
//!
//! Both transactions run their steps strictly in sequence against a
//! [`RemoteStore`](crate::remote::RemoteStore) and stop at the first terminal
//! failure, reporting which step failed through [`PublishError`] /
//! [`DeleteError`]. Nothing is retried: a stale catalog fingerprint surfaces
//! as [`LauncherError::CatalogConflict`] and the caller decides what to do.
//!
//! Release tags are derived from the map id and version with [`release_tag`];
//! [`tag_belongs_to`] is the matching predicate used when deleting.

mod delete;
mod transaction;
pub mod validate;

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use thiserror::Error;

use crate::core::{ErrorKind, LauncherError};

pub use delete::{DeleteReport, DeleteTransaction};
pub use transaction::PublishTransaction;
pub use validate::validate_map_archive;

/// Callback receiving one status line per transaction step.
pub type StatusFn = Arc<dyn Fn(&str) + Send + Sync>;

/// What the user is publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapInfo {
    /// Catalog key
    pub id: String,
    /// Display name
    pub name: String,
    /// New version, must be strictly greater than the published one
    pub version: String,
    /// Release notes and catalog description
    pub description: String,
}

impl MapInfo {
    /// Map info with an empty description.
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            description: String::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Steps of a publish, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    /// Resolve the acting identity
    Authenticate,
    /// Check the archive looks like a world save
    Validate,
    /// Read the catalog and compare versions
    CheckVersion,
    /// Create the tagged release
    CreateRelease,
    /// Upload the map and resource pack
    UploadAssets,
    /// Write the updated entry back
    UpdateCatalog,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Authenticate => "authenticate",
            Self::Validate => "validate archive",
            Self::CheckVersion => "check version",
            Self::CreateRelease => "create release",
            Self::UploadAssets => "upload assets",
            Self::UpdateCatalog => "update catalog",
        })
    }
}

/// Steps of a delete, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStep {
    /// Resolve the acting identity
    Authenticate,
    /// Read the catalog
    ReadCatalog,
    /// Check author or admin rights
    Authorize,
    /// Delete the map's releases
    DeleteReleases,
    /// Delete leftover tags
    DeleteTags,
    /// Remove the entry from the catalog
    UpdateCatalog,
}

impl fmt::Display for DeleteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Authenticate => "authenticate",
            Self::ReadCatalog => "read catalog",
            Self::Authorize => "authorize",
            Self::DeleteReleases => "delete releases",
            Self::DeleteTags => "delete tags",
            Self::UpdateCatalog => "update catalog",
        })
    }
}

/// A publish that stopped at `step`.
#[derive(Error, Debug)]
#[error("Publishing map '{map_id}' v{version} failed at step '{step}'{}: {source}",
    .tag.as_ref().map(|t| format!(" (release {t})")).unwrap_or_default())]
pub struct PublishError {
    /// Failed step
    pub step: PublishStep,
    /// Map being published
    pub map_id: String,
    /// Version being published
    pub version: String,
    /// Release tag, once one was derived
    pub tag: Option<String>,
    /// Underlying failure
    #[source]
    pub source: LauncherError,
}

impl PublishError {
    /// Classification of the underlying failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// A delete that stopped at `step`.
#[derive(Error, Debug)]
#[error("Deleting map '{map_id}' failed at step '{step}': {source}")]
pub struct DeleteError {
    /// Failed step
    pub step: DeleteStep,
    /// Map being deleted
    pub map_id: String,
    /// Underlying failure
    #[source]
    pub source: LauncherError,
}

impl DeleteError {
    /// Classification of the underlying failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Release tag for `id` at `version`: `map-<id>-v<version>`.
#[must_use]
pub fn release_tag(id: &str, version: &str) -> String {
    format!("map-{id}-v{version}")
}

static TAG_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+(\.[0-9]+)*$").unwrap_or_else(|e| unreachable!("invalid tag regex: {e}"))
});

/// Whether `tag` is a release tag of map `id`.
///
/// Requires `map-<id>-v` followed by a dotted numeric version, so `winter`
/// never claims the tags of `winter-night`.
#[must_use]
pub fn tag_belongs_to(tag: &str, id: &str) -> bool {
    tag.strip_prefix(&format!("map-{id}-v")).is_some_and(|version| TAG_VERSION.is_match(version))
}

fn report(status: Option<&StatusFn>, message: &str) {
    if let Some(status) = status {
        status(message);
    }
}
