//! `maps`, `install-map` and `content`.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::CommandContext;
use crate::catalog::MapEntry;
use crate::decision::Decision;

/// List the catalog's maps.
#[derive(Args, Debug)]
pub struct MapsCommand {
    /// Only show maps whose id, name or description contains this text.
    #[arg(long, short)]
    filter: Option<String>,

    /// Bypass caches between the launcher and the catalog.
    #[arg(long)]
    cache_bust: bool,
}

impl MapsCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let (launcher, _) = context.launcher()?;
        let catalog = launcher.fetch_catalog(self.cache_bust).await?;
        let maps = catalog.list_maps(self.filter.as_deref());

        if maps.is_empty() {
            context.say("No maps found.");
            return Ok(());
        }
        for map in maps {
            context.say(format_map(map));
        }
        Ok(())
    }
}

fn format_map(map: &MapEntry) -> String {
    let mut line = format!(
        "{} {} v{} by {}",
        map.id.bold(),
        map.name,
        map.latest_version,
        map.author.as_deref().unwrap_or("N/A")
    );
    if map.resource_pack().is_some() {
        line.push_str(&format!(" {}", "[resource pack]".dimmed()));
    }
    if !map.description.is_empty() {
        line.push_str(&format!("\n    {}", map.description));
    }
    line
}

/// Download a map (and its resource pack) into the game directory.
#[derive(Args, Debug)]
pub struct InstallMapCommand {
    /// Map id from `zrl maps`.
    id: String,

    /// Bypass caches between the launcher and the catalog.
    #[arg(long)]
    cache_bust: bool,
}

impl InstallMapCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let (launcher, progress) = context.launcher()?;
        let catalog = launcher.fetch_catalog(self.cache_bust).await?;
        let result = launcher.install_map(&catalog, &self.id).await;
        progress.finish();
        let outcome = result?;

        context.say(format!("Map installed to {}", outcome.world_dir.display()).green().to_string());
        if let Some(pack) = outcome.resource_pack {
            context.say(format!("Resource pack installed to {}", pack.display()));
        }
        Ok(())
    }
}

/// Install a content pack unlocked by a code.
#[derive(Args, Debug)]
pub struct ContentCommand {
    /// Content pack code.
    code: String,
}

impl ContentCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        let (launcher, progress) = context.launcher()?;
        let catalog = launcher.fetch_catalog(true).await?;
        let result = launcher.install_content(&catalog, self.code.trim()).await;
        progress.finish();
        let installed = result?;

        context.say(format!("Installed {} file(s) into the mods folder", installed.files.len()).green().to_string());
        if let Decision::Offer(offer) = &installed.mod_update {
            context.say(format!("Mod {} is available: run `zrl update-mod`", offer.remote_version));
        }
        Ok(())
    }
}
