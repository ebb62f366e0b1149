//! Engine settings loaded from `settings.toml`.
//!
//! Every field has a default matching the public ZombieRool distribution, so
//! a missing file is not an error. The file only needs the keys that differ:
//!
//! ```toml
//! repo_owner = "my-fork"
//! propagation_delay_secs = 5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::{
    APP_DIR_NAME, ASSET_READ_TIMEOUT, DEFAULT_API_BASE, DEFAULT_BRANCH, DEFAULT_CATALOG_PATH,
    DEFAULT_CATALOG_URL, DEFAULT_MOD_FILE_PREFIX, DEFAULT_REPO_NAME, DEFAULT_REPO_OWNER,
    HELPER_START_DELAY, METADATA_TIMEOUT, RELEASE_PROPAGATION_DELAY,
};
use crate::core::{LauncherError, Result};

/// Environment variable overriding the settings file location.
pub const CONFIG_PATH_ENV: &str = "ZRL_CONFIG_PATH";

/// Tunable engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Public raw URL of the catalog
    pub catalog_url: String,
    /// Repository owner
    pub repo_owner: String,
    /// Repository name
    pub repo_name: String,
    /// Branch holding the catalog
    pub branch: String,
    /// Catalog path inside the repository
    pub catalog_path: String,
    /// REST API root
    pub api_base: String,
    /// File name prefix of the mod jar
    pub mod_file_prefix: String,
    /// Timeout for catalog and API requests
    pub metadata_timeout_secs: u64,
    /// Maximum wait for the next chunk of an asset download
    pub asset_timeout_secs: u64,
    /// Wait before the self-update helper swaps executables
    pub helper_delay_secs: u64,
    /// Wait after deleting releases or tags
    pub propagation_delay_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            repo_owner: DEFAULT_REPO_OWNER.to_string(),
            repo_name: DEFAULT_REPO_NAME.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            catalog_path: DEFAULT_CATALOG_PATH.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            mod_file_prefix: DEFAULT_MOD_FILE_PREFIX.to_string(),
            metadata_timeout_secs: METADATA_TIMEOUT.as_secs(),
            asset_timeout_secs: ASSET_READ_TIMEOUT.as_secs(),
            helper_delay_secs: HELPER_START_DELAY.as_secs(),
            propagation_delay_secs: RELEASE_PROPAGATION_DELAY.as_secs(),
        }
    }
}

impl Settings {
    /// Load from `ZRL_CONFIG_PATH` or the default location; defaults when absent.
    pub async fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => Self::default_path()?,
        };
        Self::load_or_default(&path).await
    }

    /// Load from `path`, or defaults when it does not exist.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if fs::try_exists(path).await.unwrap_or(false) {
            Self::load_from(path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load from `path`.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await.map_err(|e| LauncherError::io(path, e))?;
        toml::from_str(&content).map_err(|e| LauncherError::Config {
            message: format!("failed to parse {}: {e}", path.display()),
        })
    }

    /// Save to `path`.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| LauncherError::Config {
            message: format!("failed to serialize settings: {e}"),
        })?;
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || crate::utils::fs::safe_write(&path, &content))
            .await
            .map_err(|e| LauncherError::Config {
                message: format!("settings write task failed: {e}"),
            })?
    }

    /// `<config dir>/ZombieRoolLauncher/settings.toml`.
    pub fn default_path() -> Result<PathBuf> {
        Ok(app_config_dir()?.join("settings.toml"))
    }

    /// Catalog and API request timeout.
    #[must_use]
    pub const fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }

    /// Per-chunk asset read timeout.
    #[must_use]
    pub const fn asset_timeout(&self) -> Duration {
        Duration::from_secs(self.asset_timeout_secs)
    }

    /// Self-update helper delay.
    #[must_use]
    pub const fn helper_delay(&self) -> Duration {
        Duration::from_secs(self.helper_delay_secs)
    }

    /// Release deletion propagation delay.
    #[must_use]
    pub const fn propagation_delay(&self) -> Duration {
        Duration::from_secs(self.propagation_delay_secs)
    }
}

/// Per-user application directory: `%APPDATA%`, `~/Library/Application Support`
/// or `~/.config`, followed by `ZombieRoolLauncher`.
pub fn app_config_dir() -> Result<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME)).ok_or_else(|| LauncherError::Config {
        message: "unable to determine the user configuration directory".to_string(),
    })
}
