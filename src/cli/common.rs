//! State shared by every subcommand.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::warn;

use crate::config::{Preferences, Settings};
use crate::engine::Launcher;
use crate::fetch::CancelToken;
use crate::paths::default_minecraft_dir;
use crate::publish::StatusFn;
use crate::utils::DownloadProgress;

/// Loaded configuration plus the global flags.
#[derive(Debug)]
pub struct CommandContext {
    /// Engine settings
    pub settings: Settings,
    /// User preferences
    pub preferences: Preferences,
    /// Game directory, from `--game-dir`, the preferences or the platform default
    pub game_root: Option<PathBuf>,
    /// Credential for remote writes
    pub token: Option<String>,
    /// Hide progress bars
    pub no_progress: bool,
    /// Only print errors
    pub quiet: bool,
}

impl CommandContext {
    /// Load settings and preferences and resolve the game directory.
    pub async fn load(
        game_dir: Option<PathBuf>,
        token: Option<String>,
        preferences_path: Option<PathBuf>,
        no_progress: bool,
        quiet: bool,
    ) -> Result<Self> {
        let settings = Settings::load().await.context("Failed to load launcher settings")?;
        let preferences = match preferences_path {
            Some(path) => Preferences::load_from(&path),
            None => Preferences::load().context("Failed to locate the preferences file")?,
        };
        let game_root = game_dir.or_else(|| preferences.minecraft_path()).or_else(default_minecraft_dir);
        Ok(Self {
            settings,
            preferences,
            game_root,
            token,
            no_progress,
            quiet,
        })
    }

    /// Engine wired to this context, plus its progress renderer.
    pub fn launcher(&self) -> Result<(Launcher, Arc<DownloadProgress>)> {
        let progress = DownloadProgress::new(!self.no_progress && !self.quiet);
        let launcher = Launcher::new(self.settings.clone())?
            .with_game_root(self.game_root.clone())
            .with_token(self.token.clone())
            .with_progress(progress.observer())
            .with_status(self.status_printer())
            .with_abort(interrupt_token());
        Ok((launcher, progress))
    }

    /// Print `message` unless `--quiet`.
    pub fn say(&self, message: impl AsRef<str>) {
        if !self.quiet {
            println!("{}", message.as_ref());
        }
    }

    /// Status callback printing dimmed step lines.
    pub fn status_printer(&self) -> StatusFn {
        let quiet = self.quiet;
        Arc::new(move |message: &str| {
            if !quiet {
                println!("{}", message.cyan());
            }
        })
    }
}

/// Token cancelled by the first Ctrl-C; a second one exits.
///
/// Must be called from within a tokio runtime.
fn interrupt_token() -> CancelToken {
    let token = CancelToken::new();
    let watched = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted, cancelling downloads");
        eprintln!("{}", "Cancelling downloads, press Ctrl-C again to quit".yellow());
        watched.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
    token
}
