//! Configuration: engine settings and user preferences.
//!
//! Two files live in the per-user application directory
//! (`%APPDATA%\ZombieRoolLauncher`, `~/Library/Application Support/ZombieRoolLauncher`
//! or `~/.config/ZombieRoolLauncher`):
//!
//! - `settings.toml` ([`Settings`]): repository coordinates, timeouts and
//!   delays. Overridable with `ZRL_CONFIG_PATH`.
//! - `config.json` ([`Preferences`]): language, theme and game path chosen by
//!   the user.
//!
//! The GitHub token is never stored; it comes from `--token` or `GITHUB_TOKEN`.

pub mod preferences;
pub mod settings;

pub use preferences::Preferences;
pub use settings::{CONFIG_PATH_ENV, Settings, app_config_dir};
