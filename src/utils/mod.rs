//! Cross-cutting helpers: file system operations and progress rendering.

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, safe_write};
pub use progress::{DownloadProgress, MultiProgress, ProgressBar, ProgressStyle};
