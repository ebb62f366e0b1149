//! File system helpers shared by the installers, configuration and self-update.
//!
//! - [`atomic`]: temp-and-rename writes for configuration files
//! - [`dirs`]: directory creation and best-effort cleanup, executable bits

pub mod atomic;
pub mod dirs;

pub use atomic::{atomic_write, safe_write};
pub use dirs::{ensure_dir, make_executable, move_file, remove_dir_if_empty, remove_quietly};
