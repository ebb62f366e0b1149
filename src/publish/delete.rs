use std::time::Duration;

use tracing::{debug, info, warn};

use super::{DeleteError, DeleteStep, StatusFn, report, tag_belongs_to};
use crate::catalog::{CatalogDocument, CatalogStore, remove_map_entry};
use crate::constants::RELEASE_PROPAGATION_DELAY;
use crate::core::LauncherError;
use crate::remote::RemoteStore;

/// What a delete removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    /// Map that was deleted
    pub map_id: String,
    /// Releases removed
    pub releases_deleted: usize,
    /// Tags removed
    pub tags_deleted: usize,
    /// Whether a catalog entry existed and was removed
    pub catalog_updated: bool,
}

/// Removes a map's releases, tags and catalog entry.
///
/// Only the entry's author or a catalog admin may delete. Release and tag
/// deletion is best-effort; the catalog write uses the fingerprint read at
/// the start, so a concurrent change fails the delete instead of being
/// overwritten.
pub struct DeleteTransaction<'a, R> {
    remote: &'a R,
    status: Option<StatusFn>,
    propagation_delay: Duration,
}

impl<'a, R: RemoteStore> DeleteTransaction<'a, R> {
    /// Transaction against `remote`.
    pub const fn new(remote: &'a R) -> Self {
        Self {
            remote,
            status: None,
            propagation_delay: RELEASE_PROPAGATION_DELAY,
        }
    }

    /// Report each step to `status`.
    #[must_use]
    pub fn with_status(mut self, status: StatusFn) -> Self {
        self.status = Some(status);
        self
    }

    /// Wait `delay` after deleting releases and after deleting tags.
    #[must_use]
    pub const fn with_propagation_delay(mut self, delay: Duration) -> Self {
        self.propagation_delay = delay;
        self
    }

    /// Delete map `map_id`.
    ///
    /// An id missing from the catalog is not an error: its releases and tags
    /// are still cleaned up (admins only) and the catalog is left untouched.
    pub async fn delete(&self, map_id: &str) -> Result<DeleteReport, DeleteError> {
        let fail = |step: DeleteStep| {
            move |source: LauncherError| DeleteError {
                step,
                map_id: map_id.to_string(),
                source,
            }
        };

        self.step("Authenticating...");
        let login = self.remote.authenticate().await.map_err(fail(DeleteStep::Authenticate))?;

        self.step("Reading catalog...");
        let store = CatalogStore::new(self.remote);
        let (catalog, fingerprint) =
            store.read(CatalogDocument::default).await.map_err(fail(DeleteStep::ReadCatalog))?;
        let entry = catalog.find_map(map_id);
        if entry.is_none() {
            info!("Map '{}' is not in the catalog; cleaning up remote releases only", map_id);
        }

        self.step("Checking permissions...");
        let author = entry.and_then(|e| e.author.clone());
        let permitted = author.as_deref() == Some(login.as_str()) || catalog.is_admin(&login);
        if !permitted {
            return Err(fail(DeleteStep::Authorize)(LauncherError::Authorization {
                actor: login,
                map_id: map_id.to_string(),
                author,
            }));
        }

        self.step("Deleting releases...");
        let releases = self.remote.list_releases().await.map_err(fail(DeleteStep::DeleteReleases))?;
        let mut releases_deleted = 0;
        for release in releases.iter().filter(|r| tag_belongs_to(&r.tag, map_id)) {
            match self.remote.delete_release(release).await {
                Ok(()) => {
                    releases_deleted += 1;
                    debug!("Deleted release {} ({})", release.tag, release.id);
                }
                Err(e) => warn!("Could not delete release {}: {}", release.tag, e),
            }
        }
        self.settle().await;

        self.step("Deleting tags...");
        let tags = self.remote.list_tags().await.map_err(fail(DeleteStep::DeleteTags))?;
        let mut tags_deleted = 0;
        for tag in tags.iter().filter(|t| tag_belongs_to(t, map_id)) {
            let result = async {
                if self.remote.get_tag_ref(tag).await?.is_some() {
                    self.remote.delete_tag_ref(tag).await?;
                    return Ok(true);
                }
                Ok::<_, LauncherError>(false)
            }
            .await;
            match result {
                Ok(true) => {
                    tags_deleted += 1;
                    debug!("Deleted tag {}", tag);
                }
                Ok(false) => debug!("Tag {} already gone", tag),
                Err(e) => warn!("Could not delete tag {}: {}", tag, e),
            }
        }
        self.settle().await;

        let catalog_updated = entry.is_some();
        if catalog_updated {
            self.step("Updating catalog...");
            let message = format!("chore: Remove map {map_id} via launcher");
            let updated = remove_map_entry(catalog.clone(), map_id);
            store
                .write(&updated, &fingerprint, &message)
                .await
                .map_err(fail(DeleteStep::UpdateCatalog))?;
        }

        info!(
            "Deleted map '{}' ({} release(s), {} tag(s))",
            map_id, releases_deleted, tags_deleted
        );
        self.step("Map deleted.");
        Ok(DeleteReport {
            map_id: map_id.to_string(),
            releases_deleted,
            tags_deleted,
            catalog_updated,
        })
    }

    async fn settle(&self) {
        if !self.propagation_delay.is_zero() {
            tokio::time::sleep(self.propagation_delay).await;
        }
    }

    fn step(&self, message: &str) {
        report(self.status.as_ref(), message);
    }
}
