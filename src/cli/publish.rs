//! `publish` and `delete`.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;

use super::common::CommandContext;
use crate::publish::MapInfo;

/// Publish a new version of a map.
///
/// Creates the release `map-<id>-v<version>`, uploads the archive (and the
/// resource pack) and records the map in the catalog.
#[derive(Args, Debug)]
pub struct PublishCommand {
    /// Map id (catalog key).
    #[arg(long)]
    id: String,

    /// Display name.
    #[arg(long)]
    name: String,

    /// New version, e.g. 1.2.0.
    #[arg(long = "version", value_name = "VERSION")]
    map_version: String,

    /// Description shown in the catalog and the release notes.
    #[arg(long, default_value = "")]
    description: String,

    /// Map archive (.zip).
    #[arg(long, value_name = "ZIP")]
    map: PathBuf,

    /// Resource pack archive (.zip).
    #[arg(long, value_name = "ZIP")]
    resource_pack: Option<PathBuf>,
}

impl PublishCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        if context.token.is_none() {
            bail!("Publishing requires a GitHub token: pass --token or set GITHUB_TOKEN");
        }
        let (launcher, _) = context.launcher()?;
        let info = MapInfo::new(self.id, self.name, self.map_version).with_description(self.description);

        let entry = launcher.publish(&info, &self.map, self.resource_pack.as_deref()).await?;
        context.say(
            format!("Published {} v{} ({})", entry.name, entry.latest_version, entry.download_url)
                .green()
                .to_string(),
        );
        Ok(())
    }
}

/// Delete a published map.
#[derive(Args, Debug)]
pub struct DeleteCommand {
    /// Map id.
    id: String,

    /// Do not ask for confirmation.
    #[arg(long, short)]
    yes: bool,
}

impl DeleteCommand {
    pub async fn execute(self, context: &CommandContext) -> Result<()> {
        if context.token.is_none() {
            bail!("Deleting requires a GitHub token: pass --token or set GITHUB_TOKEN");
        }
        if !self.yes && !confirm(&format!("Delete map '{}' and all of its releases?", self.id))? {
            context.say("Aborted.");
            return Ok(());
        }

        let (launcher, _) = context.launcher()?;
        let report = launcher.delete(&self.id).await?;
        context.say(
            format!(
                "Deleted map {} ({} release(s), {} tag(s){})",
                report.map_id,
                report.releases_deleted,
                report.tags_deleted,
                if report.catalog_updated { ", catalog updated" } else { "" }
            )
            .green()
            .to_string(),
        );
        Ok(())
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush().context("Failed to write prompt")?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer).context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
