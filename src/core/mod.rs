//! Core types shared by every launcher module.
//!
//! - [`error`]: the [`LauncherError`] taxonomy, its [`ErrorKind`] classification
//!   and the user-facing [`ErrorContext`]
//! - [`busy`]: the "operation in flight" flag read by the shell

pub mod busy;
pub mod error;

pub use busy::{Busy, BusyGuard};
pub use error::{ErrorContext, ErrorKind, LauncherError, Result, user_friendly_error};
