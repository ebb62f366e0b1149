//! Orchestration used by the command line.
//!
//! [`Launcher`] wires the settings, the public catalog, the download
//! coordinator, the installers, the self-replacer and the publish/delete
//! transactions together. Every operation that touches the game directories
//! or the remote holds the [`Busy`] flag for its whole duration, so a second
//! conflicting operation is refused instead of interleaving.
//!
//! The launcher and the mod each have an [`UpdateTracker`]. `check` moves both
//! through `Checking` to their decision; `update_mod` and
//! `prepare_launcher_update` then walk `Downloading -> Installing ->
//! Installed` (or `Failed`), and refuse to start unless the last check ended
//! in an offer.
//!
//! Methods return [`anyhow::Result`]; the typed [`LauncherError`] stays
//! reachable through the error chain for classification.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::catalog::{CatalogDocument, MapEntry, PublicCatalog};
use crate::constants::{DOWNLOAD_TEMP_DIR, LAUNCHER_UPDATE_DIR, LAUNCHER_VERSION};
use crate::config::Settings;
use crate::core::{Busy, LauncherError};
use crate::decision::{
    Decision, InvalidTransition, RemoteOffer, UpdateClass, UpdateDecisionEngine, UpdateReport, UpdateState,
    UpdateTracker, local_mod_version,
};
use crate::download::{DownloadCoordinator, DownloadJob, ProgressFn};
use crate::fetch::{AssetFetcher, CancelToken, build_http_client, file_name_from_url};
use crate::github::{GitHubClient, RepoLocation};
use crate::install::{InstallHook, Installer, MapInstallOutcome};
use crate::paths::GamePaths;
use crate::publish::{DeleteReport, DeleteTransaction, MapInfo, PublishTransaction, StatusFn};
use crate::remote::RemoteStore;
use crate::selfupdate::{SelfReplacer, SelfUpdatePlan};

/// Result of a content pack install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentInstall {
    /// Top-level paths extracted into `mods`
    pub files: Vec<PathBuf>,
    /// Mod decision re-evaluated after the install
    pub mod_update: Decision,
}

/// The launcher engine.
pub struct Launcher {
    settings: Settings,
    http: reqwest::Client,
    catalog: PublicCatalog,
    fetcher: AssetFetcher,
    progress: Option<ProgressFn>,
    status: Option<StatusFn>,
    abort: Option<CancelToken>,
    game_root: Option<PathBuf>,
    token: Option<String>,
    current_executable: Option<PathBuf>,
    busy: Busy,
    launcher_state: Arc<Mutex<UpdateTracker>>,
    mod_state: Arc<Mutex<UpdateTracker>>,
}

impl std::fmt::Debug for Launcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Launcher")
            .field("settings", &self.settings)
            .field("game_root", &self.game_root)
            .field("has_token", &self.token.is_some())
            .field("busy", &self.busy.is_busy())
            .field("launcher_state", &self.update_state(UpdateClass::Launcher))
            .field("mod_state", &self.update_state(UpdateClass::Mod))
            .finish_non_exhaustive()
    }
}

impl Launcher {
    /// Engine for `settings` with no game directory and no credential.
    pub fn new(settings: Settings) -> Result<Self> {
        let http = build_http_client().context("Failed to create HTTP client")?;
        let catalog =
            PublicCatalog::new(http.clone(), &settings.catalog_url).with_timeout(settings.metadata_timeout());
        let fetcher = AssetFetcher::with_client(http.clone()).with_read_timeout(settings.asset_timeout());
        Ok(Self {
            settings,
            http,
            catalog,
            fetcher,
            progress: None,
            status: None,
            abort: None,
            game_root: None,
            token: None,
            current_executable: None,
            busy: Busy::new(),
            launcher_state: Arc::new(Mutex::new(UpdateTracker::new(UpdateClass::Launcher))),
            mod_state: Arc::new(Mutex::new(UpdateTracker::new(UpdateClass::Mod))),
        })
    }

    /// Game root holding `mods`, `saves` and `resourcepacks`.
    #[must_use]
    pub fn with_game_root(mut self, root: Option<PathBuf>) -> Self {
        self.game_root = root;
        self
    }

    /// Credential used for publish and delete.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Per-download progress observer.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Cancel running downloads once `abort` fires.
    #[must_use]
    pub fn with_abort(mut self, abort: CancelToken) -> Self {
        self.abort = Some(abort);
        self
    }

    /// Status line observer.
    #[must_use]
    pub fn with_status(mut self, status: StatusFn) -> Self {
        self.status = Some(status);
        self
    }

    /// Replace this executable instead of the running one on self-update.
    #[must_use]
    pub fn with_current_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.current_executable = Some(path.into());
        self
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-flight flag.
    #[must_use]
    pub const fn busy(&self) -> &Busy {
        &self.busy
    }

    /// Lifecycle state of `class`. Content packs are not tracked and report
    /// [`UpdateState::Idle`].
    #[must_use]
    pub fn update_state(&self, class: UpdateClass) -> UpdateState {
        self.tracker(class)
            .map_or(UpdateState::Idle, |t| t.lock().unwrap_or_else(PoisonError::into_inner).state())
    }

    /// Fetch the public catalog.
    pub async fn fetch_catalog(&self, cache_bust: bool) -> Result<CatalogDocument> {
        self.status("Fetching catalog...");
        self.catalog
            .fetch(cache_bust)
            .await
            .with_context(|| format!("Failed to fetch catalog from {}", self.catalog.url()))
    }

    /// Version of the installed mod, `0.0.0` without a game directory.
    pub fn local_mod_version(&self) -> Result<String> {
        let paths = match &self.game_root {
            Some(root) => GamePaths::resolve(root)?,
            None => None,
        };
        Ok(local_mod_version(paths.as_ref().map(|p| p.mods.as_path()), &self.settings.mod_file_prefix))
    }

    /// Compare the catalog against the running launcher and installed mod.
    pub async fn check(&self, cache_bust: bool) -> Result<(CatalogDocument, UpdateReport)> {
        const TRACKED: [UpdateClass; 2] = [UpdateClass::Launcher, UpdateClass::Mod];
        let _guard = self.busy.begin("check")?;
        for class in TRACKED {
            self.advance(class, UpdateState::Checking)?;
        }

        let evaluated = async {
            let catalog = self.fetch_catalog(cache_bust).await?;
            let report = UpdateDecisionEngine::evaluate(&catalog, LAUNCHER_VERSION, &self.local_mod_version()?);
            Ok::<_, anyhow::Error>((catalog, report))
        }
        .await;
        let (catalog, report) = match evaluated {
            Ok(checked) => checked,
            Err(e) => {
                for class in TRACKED {
                    self.fail(class);
                }
                return Err(e);
            }
        };

        debug!("Update report: {:?}", report);
        self.advance(UpdateClass::Launcher, (&report.launcher).into())?;
        self.advance(UpdateClass::Mod, (&report.mod_update).into())?;
        Ok((catalog, report))
    }

    /// Replace the installed mod with the offered version.
    pub async fn update_mod(&self, offer: &RemoteOffer) -> Result<PathBuf> {
        ensure_class(offer, UpdateClass::Mod)?;
        let _guard = self.busy.begin("update-mod")?;
        self.advance(UpdateClass::Mod, UpdateState::Downloading)?;

        let installed = async {
            let paths = self.game_paths("mods")?;
            self.status(&format!("Updating mod to {}...", offer.remote_version));
            let installer = self.installer(&paths).with_install_hook(self.install_hook(UpdateClass::Mod));
            installer
                .install_mod(&paths, &offer.download_url)
                .await
                .with_context(|| format!("Failed to update the mod to {}", offer.remote_version))
        }
        .await;
        let jar = self.finish(UpdateClass::Mod, installed)?;
        info!("Mod updated to {} ({})", offer.remote_version, jar.display());
        Ok(jar)
    }

    /// Download the offered launcher and prepare the helper that swaps it in.
    ///
    /// The returned plan still has to be [executed](SelfUpdatePlan::execute).
    pub async fn prepare_launcher_update(&self, offer: &RemoteOffer) -> Result<SelfUpdatePlan> {
        ensure_class(offer, UpdateClass::Launcher)?;
        let _guard = self.busy.begin("update-launcher")?;
        self.advance(UpdateClass::Launcher, UpdateState::Downloading)?;
        let prepared = self.download_and_prepare(offer).await;
        let plan = self.finish(UpdateClass::Launcher, prepared)?;
        info!("Launcher {} ready to install", offer.remote_version);
        Ok(plan)
    }

    async fn download_and_prepare(&self, offer: &RemoteOffer) -> Result<SelfUpdatePlan> {
        let current = match &self.current_executable {
            Some(path) => path.clone(),
            None => std::env::current_exe().context("Cannot locate the running executable")?,
        };
        let exe_dir = current.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let fallback = current.file_name().map_or_else(|| "zrl".to_string(), |n| n.to_string_lossy().into_owned());
        let target = exe_dir.join(LAUNCHER_UPDATE_DIR).join(file_name_from_url(&offer.download_url, &fallback));

        self.status(&format!("Downloading launcher {}...", offer.remote_version));
        let mut results = self
            .coordinator()
            .download_all(vec![DownloadJob::new("launcher", &offer.download_url, &target)])
            .await
            .with_context(|| format!("Failed to download launcher {}", offer.remote_version))?;
        let downloaded = results.remove("launcher").unwrap_or(target);

        self.advance(UpdateClass::Launcher, UpdateState::Installing)?;
        let plan = SelfReplacer::new()
            .with_delay(self.settings.helper_delay())
            .with_current_executable(current)
            .prepare(&downloaded)
            .context("Failed to prepare the launcher update")?;
        Ok(plan)
    }

    /// Install map `id` from `catalog`.
    pub async fn install_map(&self, catalog: &CatalogDocument, id: &str) -> Result<MapInstallOutcome> {
        let entry = catalog.find_map(id).ok_or_else(|| anyhow::anyhow!("Map '{id}' is not in the catalog"))?;
        let _guard = self.busy.begin("install-map")?;
        let paths = self.game_paths("saves")?;
        self.status(&format!("Installing map {} v{}...", entry.name, entry.latest_version));
        self.installer(&paths)
            .install_map(&paths, entry)
            .await
            .with_context(|| format!("Failed to install map '{id}'"))
    }

    /// Install content pack `code` from `catalog`, then re-check the mod.
    pub async fn install_content(&self, catalog: &CatalogDocument, code: &str) -> Result<ContentInstall> {
        let pack = catalog
            .find_content_pack(code)
            .ok_or_else(|| anyhow::anyhow!("No content pack with code '{code}'"))?;
        let _guard = self.busy.begin("install-content")?;
        let paths = self.game_paths("mods")?;
        self.status(&format!("Installing content pack {}...", pack.name));
        let files = self
            .installer(&paths)
            .install_content(&paths, pack)
            .await
            .with_context(|| format!("Failed to install content pack '{code}'"))?;

        let local = local_mod_version(Some(&paths.mods), &self.settings.mod_file_prefix);
        self.advance(UpdateClass::Mod, UpdateState::Checking)?;
        let mod_update = UpdateDecisionEngine::decide(UpdateClass::Mod, Some(local.as_str()), catalog.mod_info.as_ref());
        self.advance(UpdateClass::Mod, (&mod_update).into())?;
        Ok(ContentInstall { files, mod_update })
    }

    /// GitHub client for the configured repository and credential.
    #[must_use]
    pub fn github(&self) -> GitHubClient {
        GitHubClient::new(self.http.clone(), RepoLocation::from(&self.settings), self.token.clone())
            .with_timeout(self.settings.metadata_timeout())
    }

    /// Publish through the configured GitHub repository.
    pub async fn publish(&self, info: &MapInfo, map: &Path, resource_pack: Option<&Path>) -> Result<MapEntry> {
        self.publish_to(&self.github(), info, map, resource_pack).await
    }

    /// Publish through `remote`.
    pub async fn publish_to<R: RemoteStore>(
        &self,
        remote: &R,
        info: &MapInfo,
        map: &Path,
        resource_pack: Option<&Path>,
    ) -> Result<MapEntry> {
        let _guard = self.busy.begin("publish")?;
        let mut transaction = PublishTransaction::new(remote);
        if let Some(status) = &self.status {
            transaction = transaction.with_status(status.clone());
        }
        Ok(transaction.publish(info, map, resource_pack).await?)
    }

    /// Delete through the configured GitHub repository.
    pub async fn delete(&self, map_id: &str) -> Result<DeleteReport> {
        self.delete_from(&self.github(), map_id).await
    }

    /// Delete through `remote`.
    pub async fn delete_from<R: RemoteStore>(&self, remote: &R, map_id: &str) -> Result<DeleteReport> {
        let _guard = self.busy.begin("delete")?;
        let mut transaction =
            DeleteTransaction::new(remote).with_propagation_delay(self.settings.propagation_delay());
        if let Some(status) = &self.status {
            transaction = transaction.with_status(status.clone());
        }
        Ok(transaction.delete(map_id).await?)
    }

    fn tracker(&self, class: UpdateClass) -> Option<&Arc<Mutex<UpdateTracker>>> {
        match class {
            UpdateClass::Launcher => Some(&self.launcher_state),
            UpdateClass::Mod => Some(&self.mod_state),
            UpdateClass::Content => None,
        }
    }

    fn advance(&self, class: UpdateClass, next: UpdateState) -> Result<(), LauncherError> {
        match self.tracker(class) {
            Some(tracker) => Ok(advance_tracker(tracker, next)?),
            None => Ok(()),
        }
    }

    fn fail(&self, class: UpdateClass) {
        if let Err(e) = self.advance(class, UpdateState::Failed) {
            warn!("{}", e);
        }
    }

    /// Settle a transfer: `Installed` on success, `Failed` otherwise.
    fn finish<T>(&self, class: UpdateClass, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.advance(class, UpdateState::Installed)?;
                Ok(value)
            }
            Err(e) => {
                self.fail(class);
                Err(e)
            }
        }
    }

    fn install_hook(&self, class: UpdateClass) -> InstallHook {
        let tracker = self.tracker(class).cloned();
        Arc::new(move || {
            let Some(tracker) = &tracker else {
                return;
            };
            if let Err(e) = advance_tracker(tracker, UpdateState::Installing) {
                warn!("{}", e);
            }
        })
    }

    fn game_paths(&self, needed: &str) -> Result<GamePaths> {
        Ok(GamePaths::require(self.game_root.as_deref(), needed)?)
    }

    fn coordinator(&self) -> DownloadCoordinator {
        let mut coordinator = DownloadCoordinator::new(self.fetcher.clone());
        if let Some(progress) = &self.progress {
            coordinator = coordinator.with_progress(progress.clone());
        }
        if let Some(abort) = &self.abort {
            coordinator = coordinator.with_abort(abort.clone());
        }
        coordinator
    }

    fn installer(&self, paths: &GamePaths) -> Installer {
        Installer::new(self.coordinator(), paths.root.join(DOWNLOAD_TEMP_DIR), &self.settings.mod_file_prefix)
    }

    fn status(&self, message: &str) {
        if let Some(status) = &self.status {
            status(message);
        }
    }
}

fn advance_tracker(tracker: &Mutex<UpdateTracker>, next: UpdateState) -> Result<(), InvalidTransition> {
    tracker.lock().unwrap_or_else(PoisonError::into_inner).advance(next)
}

fn ensure_class(offer: &RemoteOffer, expected: UpdateClass) -> Result<(), LauncherError> {
    if offer.class == expected {
        Ok(())
    } else {
        Err(LauncherError::Config {
            message: format!("a {} offer cannot be applied as a {} update", offer.class, expected),
        })
    }
}
