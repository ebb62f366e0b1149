//! Command-line interface for the ZombieRool launcher.
//!
//! The CLI stands in for the launcher window: every button of the desktop
//! shell has a subcommand here, all backed by [`crate::engine::Launcher`].
//!
//! # Commands
//!
//! | Command | Purpose |
//! |---|---|
//! | `check` | compare launcher and mod versions with the catalog; self-updates when the launcher is outdated |
//! | `update-mod` | install the catalog's mod version |
//! | `update-launcher` | replace this executable with the catalog's launcher |
//! | `maps` | list catalog maps |
//! | `install-map` | download and install a map and its resource pack |
//! | `content` | install a content pack by its unlock code |
//! | `publish` | publish a new map version |
//! | `delete` | remove a map, its releases and its tags |
//! | `config` | read and write preferences |
//!
//! # Global options
//!
//! `--verbose`/`--quiet` pick the log level (`RUST_LOG` wins when set),
//! `--no-progress` hides download bars, `--game-dir` overrides the stored
//! game directory and `--token` (or `GITHUB_TOKEN`) supplies the credential
//! for `publish` and `delete`.

mod common;
mod config;
mod maps;
mod publish;
mod updates;


use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub use common::CommandContext;

/// Environment variable overriding the preferences file location.
pub const PREFERENCES_PATH_ENV: &str = "ZRL_PREFERENCES_PATH";

/// Top-level command line.
#[derive(Parser, Debug)]
#[command(
    name = "zrl",
    about = "ZombieRool launcher - keep the mod up to date, install and publish maps",
    version,
    long_about = "Checks the ZombieRool catalog for launcher and mod updates, installs maps and \
                  content packs into the game directory, and publishes maps for other players."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug output.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Hide download progress bars.
    #[arg(long, global = true)]
    no_progress: bool,

    /// Game directory containing mods, saves and resourcepacks.
    #[arg(long, global = true, value_name = "DIR")]
    game_dir: Option<PathBuf>,

    /// GitHub token used by publish and delete.
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Preferences file (defaults to the per-user config directory).
    #[arg(long, global = true, env = PREFERENCES_PATH_ENV, value_name = "FILE")]
    preferences: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check the launcher and the mod against the catalog.
    Check(updates::CheckCommand),

    /// Install the latest mod version.
    UpdateMod(updates::UpdateModCommand),

    /// Replace this launcher with the latest version.
    UpdateLauncher(updates::UpdateLauncherCommand),

    /// List the maps in the catalog.
    Maps(maps::MapsCommand),

    /// Download and install a map.
    InstallMap(maps::InstallMapCommand),

    /// Install a content pack by its code.
    Content(maps::ContentCommand),

    /// Publish a new map version.
    Publish(publish::PublishCommand),

    /// Delete a published map.
    Delete(publish::DeleteCommand),

    /// Read and write preferences.
    Config(config::ConfigCommand),
}

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Whether download bars are hidden
    pub no_progress: bool,
}

impl CliConfig {
    /// Install the global tracing subscriber. Later calls are no-ops.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

impl Cli {
    /// Run the parsed command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();

        let context = CommandContext::load(
            self.game_dir,
            self.token,
            self.preferences,
            config.no_progress,
            self.quiet,
        )
        .await?;

        match self.command {
            Commands::Check(cmd) => cmd.execute(&context).await,
            Commands::UpdateMod(cmd) => cmd.execute(&context).await,
            Commands::UpdateLauncher(cmd) => cmd.execute(&context).await,
            Commands::Maps(cmd) => cmd.execute(&context).await,
            Commands::InstallMap(cmd) => cmd.execute(&context).await,
            Commands::Content(cmd) => cmd.execute(&context).await,
            Commands::Publish(cmd) => cmd.execute(&context).await,
            Commands::Delete(cmd) => cmd.execute(&context).await,
            Commands::Config(cmd) => cmd.execute(context),
        }
    }

    /// Translate the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };
        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
        }
    }
}
