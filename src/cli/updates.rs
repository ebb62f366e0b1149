//! `check`, `update-mod` and `update-launcher`.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::info;

use super::common::CommandContext;
use crate::decision::{Decision, RemoteOffer};
use crate::engine::Launcher;

/// Compare the launcher and the mod with the catalog.
///
/// An outdated launcher is replaced right away; the command then exits so
/// the helper can swap the executable.
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Bypass caches between the launcher and the catalog.
    #[arg(long)]
    cache_bust: bool,
}

impl CheckCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let (launcher, progress) = context.launcher()?;
        let (_, report) = launcher.check(self.cache_bust).await?;

        context.say(describe("Launcher", &report.launcher));
        context.say(describe("Mod", &report.mod_update));

        if let Some(offer) = report.launcher.offer().filter(|offer| offer.auto_apply) {
            context.say(format!("Updating the launcher to {}...", offer.remote_version).yellow().to_string());
            let result = apply_launcher_update(&launcher, offer).await;
            progress.finish();
            return result;
        }
        if let Some(offer) = report.mod_update.offer() {
            context.say(format!("Run `zrl update-mod` to install mod {}", offer.remote_version));
        }
        Ok(())
    }
}

/// Install the mod version announced by the catalog.
#[derive(Args, Debug)]
pub struct UpdateModCommand {
    /// Bypass caches between the launcher and the catalog.
    #[arg(long)]
    cache_bust: bool,
}

impl UpdateModCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let (launcher, progress) = context.launcher()?;
        let (_, report) = launcher.check(self.cache_bust).await?;

        match &report.mod_update {
            Decision::Offer(offer) => {
                let result = launcher.update_mod(offer).await;
                progress.finish();
                let jar = result?;
                context.say(
                    format!("Mod updated to {} ({})", offer.remote_version, jar.display()).green().to_string(),
                );
            }
            other => context.say(describe("Mod", other)),
        }
        Ok(())
    }
}

/// Replace this executable with the catalog's launcher.
#[derive(Args, Debug)]
pub struct UpdateLauncherCommand {
    /// Bypass caches between the launcher and the catalog.
    #[arg(long)]
    cache_bust: bool,
}

impl UpdateLauncherCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let (launcher, progress) = context.launcher()?;
        let (_, report) = launcher.check(self.cache_bust).await?;

        match &report.launcher {
            Decision::Offer(offer) => {
                let result = apply_launcher_update(&launcher, offer).await;
                progress.finish();
                result
            }
            other => {
                context.say(describe("Launcher", other));
                Ok(())
            }
        }
    }
}

/// Download, prepare and hand over to the helper. Only returns on failure.
async fn apply_launcher_update(launcher: &Launcher, offer: &RemoteOffer) -> Result<()> {
    let plan = launcher.prepare_launcher_update(offer).await?;
    info!("Handing over to {}", plan.helper_script.display());
    match plan.execute()? {}
}

fn describe(label: &str, decision: &Decision) -> String {
    match decision {
        Decision::UpToDate { local } => format!("{label}: {} {}", local, "(up to date)".green()),
        Decision::Offer(offer) => format!(
            "{label}: {} -> {} {}",
            offer.local,
            offer.remote_version,
            "(update available)".yellow()
        ),
        Decision::Unavailable => format!("{label}: {}", "no update information".dimmed()),
    }
}
