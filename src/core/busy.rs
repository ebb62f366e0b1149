//! In-flight operation tracking.
//!
//! The shell disables conflicting controls while a download, install or publish
//! is running. [`Busy`] is the shared flag it reads; [`BusyGuard`] clears it on
//! drop so an early `?` return can never leave the launcher stuck "busy".

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::error::{LauncherError, Result};

/// Shared "an operation is in flight" flag.
#[derive(Debug, Clone, Default)]
pub struct Busy {
    flag: Arc<AtomicBool>,
}

impl Busy {
    /// New idle flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an operation currently holds the flag.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Claim the flag for `operation`.
    ///
    /// Fails when another operation is already running.
    pub fn begin(&self, operation: &str) -> Result<BusyGuard> {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LauncherError::Busy {
                operation: operation.to_string(),
            })?;
        Ok(BusyGuard {
            flag: Arc::clone(&self.flag),
        })
    }
}

/// Releases the [`Busy`] flag when dropped.
#[derive(Debug)]
pub struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
