//! `zrl`: ZombieRool launcher entry point.
//!
//! Parses the command line, runs the command and turns any failure into a
//! short classified message before exiting with status 1.

use anyhow::Result;
use clap::Parser;
use zrl_launcher::cli;
use zrl_launcher::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
