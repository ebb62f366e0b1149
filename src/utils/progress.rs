//! Progress indicators for downloads and long-running remote steps.
//!
//! Thin wrappers over `indicatif` with the launcher's styling. Every bar is
//! hidden when progress is disabled, either through the `--no-progress` flag
//! or the `ZRL_NO_PROGRESS` environment variable, so scripted and CI runs get
//! plain log output.
//!
//! [`DownloadProgress`] adapts the per-job callback of
//! [`crate::download::DownloadCoordinator`] to one bar per job.

use std::sync::Arc;

use dashmap::DashMap;
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};

use crate::download::ProgressFn;

/// Whether the environment disables progress output.
#[must_use]
pub fn is_progress_disabled() -> bool {
    std::env::var_os("ZRL_NO_PROGRESS").is_some()
}

/// A download bar with launcher styling.
#[derive(Clone, Debug)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Byte-counting bar; a spinner-like bar when `total` is unknown.
    #[must_use]
    pub fn for_download(total: Option<u64>) -> Self {
        if is_progress_disabled() {
            return Self::hidden();
        }
        let bar = match total {
            Some(len) => {
                let bar = IndicatifBar::new(len);
                bar.set_style(ProgressStyle::download());
                bar
            }
            None => {
                let bar = IndicatifBar::new_spinner();
                bar.set_style(ProgressStyle::download_indeterminate());
                bar
            }
        };
        Self { inner: bar }
    }

    /// A bar that never draws.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Set the leading label.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    /// Jump to `pos`.
    pub fn set_position(&self, pos: u64) {
        self.inner.set_position(pos);
    }

    /// Change the total.
    pub fn set_length(&self, len: u64) {
        self.inner.set_length(len);
    }

    /// Stop and erase.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    /// Whether the bar draws nothing.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }
}

/// Launcher progress styles.
pub struct ProgressStyle;

impl ProgressStyle {
    /// Byte transfer with known size.
    #[must_use]
    pub fn download() -> IndicatifStyle {
        IndicatifStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap_or_else(|_| IndicatifStyle::default_bar())
            .progress_chars("━╸━")
    }

    /// Byte transfer with unknown size.
    #[must_use]
    pub fn download_indeterminate() -> IndicatifStyle {
        IndicatifStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.cyan} {bytes} ({bytes_per_sec})")
            .unwrap_or_else(|_| IndicatifStyle::default_spinner())
    }
}

/// Container drawing several bars at once.
#[derive(Debug, Default, Clone)]
pub struct MultiProgress {
    inner: indicatif::MultiProgress,
}

impl MultiProgress {
    /// Empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `pb`.
    #[must_use]
    pub fn add(&self, pb: ProgressBar) -> ProgressBar {
        ProgressBar {
            inner: self.inner.add(pb.inner),
        }
    }
}

/// One bar per download job, created on the first progress event.
#[derive(Debug)]
pub struct DownloadProgress {
    multi: Option<MultiProgress>,
    bars: DashMap<String, ProgressBar>,
}

impl DownloadProgress {
    /// Renderer; draws nothing when `enabled` is false.
    #[must_use]
    pub fn new(enabled: bool) -> Arc<Self> {
        Arc::new(Self {
            multi: (enabled && !is_progress_disabled()).then(MultiProgress::new),
            bars: DashMap::new(),
        })
    }

    /// Callback to hand to the coordinator.
    #[must_use]
    pub fn observer(self: &Arc<Self>) -> ProgressFn {
        let this = Arc::clone(self);
        Arc::new(move |job: &str, done: u64, total: Option<u64>| this.update(job, done, total))
    }

    fn update(&self, job: &str, done: u64, total: Option<u64>) {
        let Some(multi) = &self.multi else {
            return;
        };
        let bar = self
            .bars
            .entry(job.to_string())
            .or_insert_with(|| {
                let bar = multi.add(ProgressBar::for_download(total));
                bar.set_prefix(job.to_string());
                bar
            })
            .clone();
        if let Some(total) = total {
            bar.set_length(total);
        }
        bar.set_position(done);
    }

    /// Finish every bar.
    pub fn finish(&self) {
        for entry in &self.bars {
            entry.value().finish_and_clear();
        }
    }
}
