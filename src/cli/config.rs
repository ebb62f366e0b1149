//! Read and write launcher preferences.
//!
//! Preferences live in `config.json` under the per-user configuration
//! directory (or the file given by `--preferences`). The launcher reads
//! `language`, `theme` and `minecraft_path`; other keys are kept as-is.
//!
//! ```bash
//! zrl config set minecraft_path ~/.minecraft
//! zrl config get theme
//! zrl config            # same as `zrl config list`
//! ```

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde_json::Value;

use super::common::CommandContext;
use crate::config::preferences::{DEFAULT_THEME, THEME};

/// `zrl config`.
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    /// Print the value of a key.
    Get {
        /// Preference key
        key: String,
    },

    /// Store a value.
    Set {
        /// Preference key
        key: String,
        /// New value
        value: String,
    },

    /// Remove a key.
    Unset {
        /// Preference key
        key: String,
    },

    /// Print every stored preference.
    List,

    /// Print the preferences file location.
    Path,
}

impl ConfigCommand {
    pub fn execute(self, context: CommandContext) -> Result<()> {
        let mut preferences = context.preferences;
        match self.command.unwrap_or(ConfigSubcommands::List) {
            ConfigSubcommands::Get { key } => match preferences.get(&key) {
                Some(value) => println!("{}", display_value(value)),
                None if key == THEME => println!("{DEFAULT_THEME}"),
                None => println!("{}", format!("'{key}' is not set").dimmed()),
            },
            ConfigSubcommands::Set { key, value } => {
                preferences
                    .set(key.as_str(), Value::String(value.clone()))
                    .with_context(|| format!("Failed to save preference '{key}'"))?;
                if !context.quiet {
                    println!("{} {} = {}", "Saved".green(), key, value);
                }
            }
            ConfigSubcommands::Unset { key } => {
                let previous = preferences
                    .remove(&key)
                    .with_context(|| format!("Failed to remove preference '{key}'"))?;
                if !context.quiet && previous.is_some() {
                    println!("{} {}", "Removed".green(), key);
                }
            }
            ConfigSubcommands::List => {
                let mut empty = true;
                for (key, value) in preferences.entries() {
                    empty = false;
                    println!("{key} = {}", display_value(value));
                }
                if empty && !context.quiet {
                    println!("{}", "No preferences set.".dimmed());
                }
            }
            ConfigSubcommands::Path => println!("{}", preferences.path().display()),
        }
        Ok(())
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
