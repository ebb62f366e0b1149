//! Installing downloaded artifacts into the game directories.
//!
//! Each operation downloads into its own directory under the shared temp
//! root, installs, and always removes that directory afterwards (plus the
//! temp root itself once it is empty).
//!
//! | Operation | Downloads | Install step |
//! |---|---|---|
//! | [`Installer::install_mod`] | mod jar | delete every `<prefix>*.jar` in `mods`, move the new jar in |
//! | [`Installer::install_map`] | map + optional resource pack, behind one barrier | extract the world into `saves`, replace the pack in `resourcepacks` |
//! | [`Installer::install_content`] | content archive | extract into `mods` |

pub mod archive;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::{ContentPack, MapEntry};
use crate::constants::MOD_FILE_EXTENSION;
use crate::core::{LauncherError, Result};
use crate::download::{DownloadCoordinator, DownloadJob, JobId};
use crate::fetch::file_name_from_url;
use crate::paths::GamePaths;
use crate::utils::fs::{move_file, remove_dir_if_empty, remove_quietly};

pub use archive::MapLayout;

const MAP_JOB: &str = "map";
const RESOURCE_PACK_JOB: &str = "resourcepack";
const CONTENT_JOB: &str = "content";
const MOD_JOB: &str = "mod";

/// Result of a map installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapInstallOutcome {
    /// World folder inside `saves`
    pub world_dir: PathBuf,
    /// Installed resource pack, if the map has one
    pub resource_pack: Option<PathBuf>,
}

/// Called once every download of an operation has succeeded, right before
/// files are put in place.
pub type InstallHook = Arc<dyn Fn() + Send + Sync>;

/// Downloads and installs mods, maps and content packs.
#[derive(Clone)]
pub struct Installer {
    coordinator: DownloadCoordinator,
    temp_root: PathBuf,
    mod_prefix: String,
    on_installing: Option<InstallHook>,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("coordinator", &self.coordinator)
            .field("temp_root", &self.temp_root)
            .field("mod_prefix", &self.mod_prefix)
            .finish_non_exhaustive()
    }
}

impl Installer {
    /// Installer downloading through `coordinator` into `temp_root`.
    pub fn new(coordinator: DownloadCoordinator, temp_root: impl Into<PathBuf>, mod_prefix: impl Into<String>) -> Self {
        Self {
            coordinator,
            temp_root: temp_root.into(),
            mod_prefix: mod_prefix.into(),
            on_installing: None,
        }
    }

    /// Run `hook` between the download and the install step.
    #[must_use]
    pub fn with_install_hook(mut self, hook: InstallHook) -> Self {
        self.on_installing = Some(hook);
        self
    }

    /// Shared temp root.
    #[must_use]
    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    /// Replace the installed mod with the jar at `download_url`.
    pub async fn install_mod(&self, paths: &GamePaths, download_url: &str) -> Result<PathBuf> {
        let fallback = format!("{}latest{}", self.mod_prefix, MOD_FILE_EXTENSION);
        let file_name = file_name_from_url(download_url, &fallback);

        self.with_temp_dir(async |temp| {
            let mut results = self
                .coordinator
                .download_all(vec![DownloadJob::new(MOD_JOB, download_url, temp.join(&file_name))])
                .await?;
            let jar = take(&mut results, MOD_JOB)?;
            self.installing();

            let mods = paths.mods.clone();
            let prefix = self.mod_prefix.clone();
            blocking(move || replace_mod_jar(&mods, &prefix, &jar)).await
        })
        .await
    }

    /// Download a map (and its resource pack) and install both.
    ///
    /// Nothing is installed unless every download succeeded.
    pub async fn install_map(&self, paths: &GamePaths, entry: &MapEntry) -> Result<MapInstallOutcome> {
        if entry.download_url.trim().is_empty() {
            return Err(LauncherError::Install {
                artifact: entry.id.clone(),
                reason: "the catalog has no download URL for this map".to_string(),
            });
        }

        self.with_temp_dir(async |temp| {
            let map_file = file_name_from_url(&entry.download_url, &format!("{}.zip", entry.id));
            let mut jobs = vec![DownloadJob::new(MAP_JOB, &entry.download_url, temp.join("map").join(map_file))];
            if let Some(url) = entry.resource_pack() {
                let pack_file = file_name_from_url(url, &format!("{}-resourcepack.zip", entry.id));
                jobs.push(DownloadJob::new(RESOURCE_PACK_JOB, url, temp.join("resourcepack").join(pack_file)));
            }

            info!("Installing map '{}' v{}", entry.name, entry.latest_version);
            let mut results = self.coordinator.download_all(jobs).await?;
            let map_zip = take(&mut results, MAP_JOB)?;
            let pack = results.remove(RESOURCE_PACK_JOB);
            self.installing();

            let paths = paths.clone();
            let name = if entry.name.trim().is_empty() { entry.id.clone() } else { entry.name.clone() };
            blocking(move || {
                let world_dir = install_world(&map_zip, &paths.saves, &name)?;
                let resource_pack = pack.map(|p| install_resource_pack(&p, &paths.resourcepacks)).transpose()?;
                Ok(MapInstallOutcome {
                    world_dir,
                    resource_pack,
                })
            })
            .await
        })
        .await
    }

    /// Download a content pack and extract it into `mods`.
    pub async fn install_content(&self, paths: &GamePaths, pack: &ContentPack) -> Result<Vec<PathBuf>> {
        if pack.download_url.trim().is_empty() {
            return Err(LauncherError::Install {
                artifact: pack.name.clone(),
                reason: "the catalog has no download URL for this content pack".to_string(),
            });
        }

        self.with_temp_dir(async |temp| {
            let file = file_name_from_url(&pack.download_url, "content.zip");
            let mut results = self
                .coordinator
                .download_all(vec![DownloadJob::new(CONTENT_JOB, &pack.download_url, temp.join(file))])
                .await?;
            let archive_path = take(&mut results, CONTENT_JOB)?;
            self.installing();

            let mods = paths.mods.clone();
            info!("Installing content pack '{}' v{}", pack.name, pack.version);
            blocking(move || archive::extract(&archive_path, &mods)).await
        })
        .await
    }

    fn installing(&self) {
        if let Some(hook) = &self.on_installing {
            hook();
        }
    }

    async fn with_temp_dir<T, F>(&self, body: F) -> Result<T>
    where
        F: AsyncFnOnce(&Path) -> Result<T>,
    {
        let temp = self.temp_root.join(format!("op-{}", uuid::Uuid::new_v4().simple()));
        let result = body(&temp).await;
        remove_quietly(&temp);
        if let Err(e) = remove_dir_if_empty(&self.temp_root) {
            debug!("Leaving temp root {}: {}", self.temp_root.display(), e);
        }
        result
    }
}

fn take(results: &mut HashMap<JobId, PathBuf>, job: &str) -> Result<PathBuf> {
    results.remove(job).ok_or_else(|| LauncherError::Install {
        artifact: job.to_string(),
        reason: "download finished without a file".to_string(),
    })
}

async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| LauncherError::Install {
        artifact: "install step".to_string(),
        reason: format!("worker task failed: {e}"),
    })?
}

/// Remove old `<prefix>*.jar` files from `mods` and move `jar` in.
fn replace_mod_jar(mods: &Path, prefix: &str, jar: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(mods).map_err(|e| LauncherError::io(mods, e))?;
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(prefix) && name.ends_with(MOD_FILE_EXTENSION) {
            std::fs::remove_file(entry.path()).map_err(|e| LauncherError::io(entry.path(), e))?;
            debug!("Removed old mod {}", name);
        }
    }

    let file_name = jar.file_name().ok_or_else(|| LauncherError::Install {
        artifact: jar.display().to_string(),
        reason: "downloaded mod has no file name".to_string(),
    })?;
    let destination = mods.join(file_name);
    move_file(jar, &destination)?;
    info!("Installed mod {}", destination.display());
    Ok(destination)
}

/// Extract a map archive into `saves` as a world folder.
///
/// The world is staged inside `saves` and then renamed to `name`; when a
/// world called `name` already exists the archive's own folder name is kept,
/// and a numeric suffix is added if that is taken too.
fn install_world(map_zip: &Path, saves: &Path, name: &str) -> Result<PathBuf> {
    let staging = saves.join(format!(".zrl-staging-{}", uuid::Uuid::new_v4().simple()));
    let result = (|| {
        let tops = archive::extract(map_zip, &staging)?;
        let (source, archive_name) = match tops.as_slice() {
            [single] if single.is_dir() => {
                let folder = single.file_name().map(|n| n.to_string_lossy().into_owned());
                (single.clone(), folder)
            }
            _ => (staging.clone(), None),
        };

        let preferred = sanitize_folder_name(name);
        let target = if !saves.join(&preferred).exists() {
            saves.join(&preferred)
        } else {
            let fallback = archive_name.map_or_else(|| preferred.clone(), |n| sanitize_folder_name(&n));
            unique_dir(saves, &fallback)
        };

        std::fs::rename(&source, &target).map_err(|e| LauncherError::io(&target, e))?;
        info!("Installed world {}", target.display());
        Ok(target)
    })();
    remove_quietly(&staging);
    result
}

/// Move a resource pack into `resourcepacks`, replacing a same-named file.
fn install_resource_pack(pack: &Path, resourcepacks: &Path) -> Result<PathBuf> {
    let file_name = pack.file_name().ok_or_else(|| LauncherError::Install {
        artifact: pack.display().to_string(),
        reason: "downloaded resource pack has no file name".to_string(),
    })?;
    let destination = resourcepacks.join(file_name);
    if destination.exists() {
        std::fs::remove_file(&destination).map_err(|e| LauncherError::io(&destination, e))?;
    }
    move_file(pack, &destination)?;
    info!("Installed resource pack {}", destination.display());
    Ok(destination)
}

fn sanitize_folder_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') || c.is_control() { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').to_string();
    if cleaned.is_empty() { "map".to_string() } else { cleaned }
}

fn unique_dir(parent: &Path, name: &str) -> PathBuf {
    let candidate = parent.join(name);
    if !candidate.exists() {
        return candidate;
    }
    (2..)
        .map(|n| parent.join(format!("{name} ({n})")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
