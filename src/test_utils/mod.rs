//! Test utilities for the launcher.
//!
//! - [`fixtures`]: map and content archives written with the `zip` crate
//! - [`MemoryRemote`]: an in-memory remote store with a mutation counter and
//!   fault injection, so transactions can be tested without a network
//!
//! # Example
//!
//! ```rust,no_run
//! use zrl_launcher::test_utils::{MemoryRemote, fixtures};
//!
//! let remote = MemoryRemote::new("alice");
//! let dir = tempfile::tempdir().unwrap();
//! let map = fixtures::nested_map_archive(dir.path(), "Winter");
//! assert_eq!(remote.mutation_count(), 0);
//! ```

pub mod fixtures;
mod remote;

pub use remote::{Fault, MemoryRemote};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging stays
/// off.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
