use std::path::Path;

use tracing::{info, warn};

use super::validate::validate_map_archive;
use super::{MapInfo, PublishError, PublishStep, StatusFn, TAG_VERSION, release_tag, report};
use crate::catalog::{CatalogDocument, CatalogStore, MapEntry, upsert_map_entry};
use crate::core::LauncherError;
use crate::remote::RemoteStore;
use crate::version::VersionComparator;

/// Publishes a new map version: release, assets, then catalog entry.
///
/// A failure after the release was created leaves that release in place;
/// no rollback is attempted.
pub struct PublishTransaction<'a, R> {
    remote: &'a R,
    status: Option<StatusFn>,
}

impl<'a, R: RemoteStore> PublishTransaction<'a, R> {
    /// Transaction against `remote`.
    pub const fn new(remote: &'a R) -> Self {
        Self { remote, status: None }
    }

    /// Report each step to `status`.
    #[must_use]
    pub fn with_status(mut self, status: StatusFn) -> Self {
        self.status = Some(status);
        self
    }

    /// Publish `info` with the map archive at `map_asset` and an optional
    /// resource pack. Returns the catalog entry as written.
    pub async fn publish(
        &self,
        info: &MapInfo,
        map_asset: &Path,
        resource_pack: Option<&Path>,
    ) -> Result<MapEntry, PublishError> {
        let fail = |step: PublishStep, tag: Option<&str>| {
            let map_id = info.id.clone();
            let version = info.version.clone();
            let tag = tag.map(ToString::to_string);
            move |source: LauncherError| PublishError {
                step,
                map_id,
                version,
                tag,
                source,
            }
        };

        self.step("Authenticating...");
        let login = self.remote.authenticate().await.map_err(fail(PublishStep::Authenticate, None))?;
        info!("Publishing map '{}' v{} as {}", info.id, info.version, login);

        self.step("Validating map archive...");
        check_input(info).map_err(fail(PublishStep::Validate, None))?;
        validate_map_archive(map_asset).map_err(fail(PublishStep::Validate, None))?;
        if let Some(pack) = resource_pack.filter(|p| !p.is_file()) {
            return Err(fail(PublishStep::Validate, None)(LauncherError::Install {
                artifact: pack.display().to_string(),
                reason: "resource pack file does not exist".to_string(),
            }));
        }

        self.step("Checking catalog version...");
        let store = CatalogStore::new(self.remote);
        let (catalog, _) = store
            .read(|| CatalogDocument::skeleton(login.clone()))
            .await
            .map_err(fail(PublishStep::CheckVersion, None))?;
        ensure_newer(&catalog, info).map_err(fail(PublishStep::CheckVersion, None))?;

        let tag = release_tag(&info.id, &info.version);
        self.step(&format!("Creating release {tag}..."));
        let release = async {
            if self.remote.get_tag_ref(&tag).await?.is_some() {
                return Err(LauncherError::DuplicateRelease { tag: tag.clone() });
            }
            let title = format!("Map: {} v{}", info.name, info.version);
            let body = if info.description.trim().is_empty() {
                "New map release."
            } else {
                info.description.as_str()
            };
            self.remote.create_release(&tag, &title, body).await
        }
        .await
        .map_err(fail(PublishStep::CreateRelease, Some(tag.as_str())))?;

        self.step("Uploading map...");
        let map_url = self
            .remote
            .upload_asset(&release, map_asset, &asset_name(map_asset, &format!("{}.zip", info.id)))
            .await
            .map_err(fail(PublishStep::UploadAssets, Some(tag.as_str())))?;
        let pack_url = match resource_pack {
            Some(pack) => {
                self.step("Uploading resource pack...");
                let name = asset_name(pack, &format!("{}-resourcepack.zip", info.id));
                Some(
                    self.remote
                        .upload_asset(&release, pack, &name)
                        .await
                        .map_err(fail(PublishStep::UploadAssets, Some(tag.as_str())))?,
                )
            }
            None => None,
        };

        self.step("Updating catalog...");
        let (catalog, fingerprint) = store
            .read(|| CatalogDocument::skeleton(login.clone()))
            .await
            .map_err(fail(PublishStep::UpdateCatalog, Some(tag.as_str())))?;
        if let Err(e) = ensure_newer(&catalog, info) {
            warn!("Catalog moved past {} while publishing; release {} is orphaned", info.version, tag);
            return Err(fail(PublishStep::UpdateCatalog, Some(tag.as_str()))(e));
        }

        let existing = catalog.find_map(&info.id).cloned();
        let action = if existing.is_some() { "Update" } else { "Add" };
        let entry = build_entry(existing, info, &login, map_url, pack_url);
        let message = format!("feat: {action} map {} (v{}) via launcher", info.name, info.version);
        let updated = upsert_map_entry(catalog, entry.clone());
        store
            .write(&updated, &fingerprint, &message)
            .await
            .map_err(fail(PublishStep::UpdateCatalog, Some(tag.as_str())))?;

        info!("Published map '{}' v{} ({})", info.id, info.version, tag);
        self.step("Map published.");
        Ok(entry)
    }

    fn step(&self, message: &str) {
        report(self.status.as_ref(), message);
    }
}

fn check_input(info: &MapInfo) -> Result<(), LauncherError> {
    let invalid = |field: &str, reason: String| LauncherError::InvalidInput {
        field: field.to_string(),
        reason,
    };
    if info.id.trim().is_empty() || info.id.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(invalid("map id", format!("'{}' must be non-empty without spaces or '/'", info.id)));
    }
    if info.name.trim().is_empty() {
        return Err(invalid("map name", "it must not be empty".to_string()));
    }
    if !TAG_VERSION.is_match(&info.version) {
        return Err(invalid("version", format!("'{}' is not a dotted numeric version", info.version)));
    }
    Ok(())
}

fn ensure_newer(catalog: &CatalogDocument, info: &MapInfo) -> Result<(), LauncherError> {
    match catalog.find_map(&info.id) {
        Some(existing) if !VersionComparator::is_newer(&info.version, &existing.latest_version) => {
            Err(LauncherError::VersionConflict {
                map_id: info.id.clone(),
                existing: existing.latest_version.clone(),
                proposed: info.version.clone(),
            })
        }
        _ => Ok(()),
    }
}

/// New catalog entry; an existing entry keeps its author and unknown fields.
fn build_entry(
    existing: Option<MapEntry>,
    info: &MapInfo,
    login: &str,
    map_url: String,
    pack_url: Option<String>,
) -> MapEntry {
    let is_new = existing.is_none();
    let mut entry = existing.unwrap_or_default();
    entry.id.clone_from(&info.id);
    entry.name.clone_from(&info.name);
    entry.latest_version.clone_from(&info.version);
    entry.description.clone_from(&info.description);
    entry.download_url = map_url;
    entry.resourcepack_url = pack_url;
    if is_new {
        entry.author = Some(login.to_string());
    }
    entry
}

fn asset_name(path: &Path, fallback: &str) -> String {
    path.file_name().map_or_else(|| fallback.to_string(), |n| n.to_string_lossy().into_owned())
}
