//! ZombieRool launcher engine.
//!
//! A self-updating client for the ZombieRool mod: it compares the running
//! launcher and the installed mod with a published catalog, downloads and
//! installs updates, maps and content packs, and lets map authors publish and
//! delete maps through a GitHub repository.
//!
//! # Architecture
//!
//! ```text
//! cli ──> engine ──┬─> catalog (public read) ──> decision
//!                  ├─> install ──> download ──> fetch
//!                  ├─> selfupdate
//!                  └─> publish ──> remote (traits) <── github
//! ```
//!
//! - [`version`]: lenient dotted version parsing and ordering
//! - [`fetch`]: single streamed download with cancellation
//! - [`download`]: concurrent jobs behind a single-fire barrier
//! - [`decision`]: update offers per channel and their lifecycle
//! - [`selfupdate`]: executable replacement through a detached helper
//! - [`catalog`]: catalog schema, public reader and fingerprinted store
//! - [`remote`] / [`github`]: remote store interfaces and the GitHub client
//! - [`publish`]: publish and delete transactions
//! - [`install`]: mod, map and content installation
//! - [`paths`] / [`config`]: game directories, settings and preferences
//! - [`engine`]: the facade used by the [`cli`]
//!
//! # Example
//!
//! ```rust,no_run
//! use zrl_launcher::config::Settings;
//! use zrl_launcher::engine::Launcher;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let launcher = Launcher::new(Settings::default())?;
//! let (_catalog, report) = launcher.check(true).await?;
//! if let Some(offer) = report.mod_update.offer() {
//!     println!("Mod {} is available", offer.remote_version);
//! }
//! # Ok(())
//! # }
//! ```

// Core
pub mod constants;
pub mod core;
pub mod version;

// Transfers
pub mod download;
pub mod fetch;

// Updates
pub mod decision;
pub mod selfupdate;

// Catalog and remote store
pub mod catalog;
pub mod github;
pub mod publish;
pub mod remote;

// Local installation
pub mod install;
pub mod paths;

// Configuration and orchestration
pub mod cli;
pub mod config;
pub mod engine;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
