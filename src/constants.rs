//! Global constants used throughout the launcher.
//!
//! Timeouts, chunk sizes and naming conventions that several modules share.
//! Most of them can be overridden through [`crate::config::Settings`]; the
//! values here are the defaults.

use std::time::Duration;

/// Version of the running launcher, compared against the catalog's
/// `launcher.latest_version`.
pub const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Raw URL of the published catalog document.
pub const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/Cryo60/ZombieRoolLauncher/refs/heads/main/updates.json";

/// Repository owner hosting the catalog and map releases.
pub const DEFAULT_REPO_OWNER: &str = "Cryo60";

/// Repository name hosting the catalog and map releases.
pub const DEFAULT_REPO_NAME: &str = "ZombieRoolLauncher";

/// Branch the catalog is committed to.
pub const DEFAULT_BRANCH: &str = "main";

/// Path of the catalog inside the repository.
pub const DEFAULT_CATALOG_PATH: &str = "updates.json";

/// GitHub REST API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// File name prefix identifying the mod jar in the `mods` directory.
pub const DEFAULT_MOD_FILE_PREFIX: &str = "ZombieRool-";

/// Extension of the mod artifact.
pub const MOD_FILE_EXTENSION: &str = ".jar";

/// Timeout for small metadata requests (catalog, API calls).
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum time to wait for the next chunk of a large asset stream.
pub const ASSET_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for establishing a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Size of the write buffer used when streaming assets to disk.
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;

/// Delay the self-update helper waits for the parent to release its handles.
pub const HELPER_START_DELAY: Duration = Duration::from_secs(2);

/// Delay between release/tag deletion and the next remote step.
pub const RELEASE_PROPAGATION_DELAY: Duration = Duration::from_secs(2);

/// Directory (next to the executable) receiving a downloaded launcher.
pub const LAUNCHER_UPDATE_DIR: &str = "temp_launcher_update";

/// Directory receiving mod, map and content downloads before install.
pub const DOWNLOAD_TEMP_DIR: &str = "temp_downloads";

/// Application directory name used for configuration files.
pub const APP_DIR_NAME: &str = "ZombieRoolLauncher";

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("zrl-launcher/", env!("CARGO_PKG_VERSION"));
