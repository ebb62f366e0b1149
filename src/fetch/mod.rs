//! Single-asset downloads with progress and cooperative cancellation.
//!
//! [`AssetFetcher`] is the leaf primitive under every install flow: it streams
//! one URL to one destination path. The body is written to a sibling `.part`
//! file and renamed into place only once the stream completed, so a cancelled
//! or failed transfer never leaves a half-written artifact at the destination.
//!
//! # Failure taxonomy
//!
//! | Failure | Error |
//! |---|---|
//! | DNS, connect, timeout, broken stream | [`LauncherError::Network`] |
//! | 4xx / 5xx status | [`LauncherError::HttpStatus`] |
//! | Disk write | [`LauncherError::Io`] |
//! | [`CancelToken`] observed | [`LauncherError::Cancelled`] |
//!
//! None of them is retried here; retry policy belongs to the caller.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use zrl_launcher::fetch::{AssetFetcher, CancelToken};
//!
//! # async fn example() -> zrl_launcher::core::Result<()> {
//! let fetcher = AssetFetcher::new()?;
//! let cancel = CancelToken::new();
//! let path = fetcher
//!     .fetch(
//!         "https://example.com/ZombieRool-1.3.0.jar",
//!         Path::new("/tmp/downloads/ZombieRool-1.3.0.jar"),
//!         |done, total| println!("{done}/{total:?}"),
//!         &cancel,
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::constants::{ASSET_READ_TIMEOUT, CONNECT_TIMEOUT, DOWNLOAD_CHUNK_SIZE, USER_AGENT};
use crate::core::{LauncherError, Result};

/// Advisory cancellation flag shared between a caller and a running fetch.
///
/// A fetch observes it while waiting for the response and for every chunk;
/// a fetch already past its last chunk completes normally. Watchers can
/// await [`cancelled`](Self::cancelled).
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// New, not-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolve once cancellation was requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Build the HTTP client shared by fetchers and API clients.
pub fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| LauncherError::from_reqwest("building HTTP client", e))
}

/// Downloads one asset at a time.
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: reqwest::Client,
    read_timeout: Duration,
}

impl AssetFetcher {
    /// Fetcher with its own HTTP client.
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(build_http_client()?))
    }

    /// Fetcher reusing an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            read_timeout: ASSET_READ_TIMEOUT,
        }
    }

    /// Override how long to wait for each body chunk.
    #[must_use]
    pub const fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Stream `url` into `destination`.
    ///
    /// `on_progress(bytes_done, bytes_total)` runs after every chunk;
    /// `bytes_total` is `None` when the server sent no content length.
    /// Parent directories of `destination` are created as needed, but only
    /// after the server accepted the request.
    pub async fn fetch<F>(
        &self,
        url: &str,
        destination: &Path,
        mut on_progress: F,
        cancel: &CancelToken,
    ) -> Result<PathBuf>
    where
        F: FnMut(u64, Option<u64>) + Send,
    {
        if cancel.is_cancelled() {
            return Err(LauncherError::Cancelled {
                url: url.to_string(),
            });
        }

        debug!("Fetching {} -> {}", url, destination.display());
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(LauncherError::Cancelled {
                    url: url.to_string(),
                });
            }
            sent = self.client.get(url).send() => {
                sent.map_err(|e| LauncherError::from_reqwest(format!("GET {url}"), e))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await.map_err(|e| LauncherError::io(parent, e))?;
        }

        let part = part_path(destination);
        match self.stream_to(url, response, &part, total, &mut on_progress, cancel).await {
            Ok(()) => {
                fs::rename(&part, destination).await.map_err(|e| {
                    LauncherError::io(destination, e)
                })?;
                debug!("Fetched {}", destination.display());
                Ok(destination.to_path_buf())
            }
            Err(e) => {
                match fs::remove_file(&part).await {
                    Err(cleanup) if cleanup.kind() != std::io::ErrorKind::NotFound => {
                        warn!("Failed to remove partial download {}: {}", part.display(), cleanup);
                    }
                    _ => {}
                }
                Err(e)
            }
        }
    }

    async fn stream_to<F>(
        &self,
        url: &str,
        mut response: reqwest::Response,
        part: &Path,
        total: Option<u64>,
        on_progress: &mut F,
        cancel: &CancelToken,
    ) -> Result<()>
    where
        F: FnMut(u64, Option<u64>) + Send,
    {
        let file = fs::File::create(part).await.map_err(|e| LauncherError::io(part, e))?;
        let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, file);
        let mut done = 0u64;

        loop {
            // A stalled stream still observes cancellation.
            let read = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Download of {} cancelled after {} bytes", url, done);
                    return Err(LauncherError::Cancelled {
                        url: url.to_string(),
                    });
                }
                read = tokio::time::timeout(self.read_timeout, response.chunk()) => read,
            };

            let chunk = read
                .map_err(|_| LauncherError::Network {
                    operation: format!("reading {url}"),
                    reason: format!("no data received for {}s", self.read_timeout.as_secs()),
                })?
                .map_err(|e| LauncherError::from_reqwest(format!("reading {url}"), e))?;

            let Some(bytes) = chunk else {
                break;
            };

            writer.write_all(&bytes).await.map_err(|e| LauncherError::io(part, e))?;
            done += bytes.len() as u64;
            on_progress(done, total);
        }

        writer.flush().await.map_err(|e| LauncherError::io(part, e))?;
        writer.into_inner().sync_all().await.map_err(|e| LauncherError::io(part, e))?;
        Ok(())
    }
}

fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    destination.with_file_name(name)
}

/// File name component of a download URL, ignoring query and fragment.
///
/// Falls back to `fallback` when the URL path has no usable last segment.
#[must_use]
pub fn file_name_from_url(url: &str, fallback: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map_or_else(|| fallback.to_string(), ToString::to_string)
}
