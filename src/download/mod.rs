//! Concurrent multi-asset downloads gated by a completion barrier.
//!
//! An install that needs several artifacts (a map and its resource pack) must
//! not start until every one of them is on disk, yet the transfers themselves
//! are independent. [`DownloadCoordinator::start`] spawns one task per
//! [`DownloadJob`] and reports through exactly one of two continuations:
//!
//! - `on_all_complete(results)` once every job finished successfully
//! - `on_any_failed(error)` on the first failure; remaining jobs are cancelled
//!   and any later failure is swallowed
//!
//! The two continuations are mutually exclusive. [`InstallBarrier`] is the
//! single-fire primitive that enforces it.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::{LauncherError, Result};
use crate::fetch::{AssetFetcher, CancelToken};

/// Identifier of a job inside one coordinator run, e.g. `"map"`.
pub type JobId = String;

/// Lifecycle of a single download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Not yet started
    Pending,
    /// Transfer in progress
    Running,
    /// File written to its destination
    Done,
    /// Terminal failure
    Failed,
    /// Stopped by a cancellation request
    Cancelled,
}

impl JobState {
    /// Whether the job can no longer change state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

/// One asset to download.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// Key of this job in the result map
    pub id: JobId,
    /// Source URL
    pub url: String,
    /// Final path of the artifact
    pub destination: PathBuf,
    /// Size hint used when the server sends no content length
    pub expected_bytes: Option<u64>,
}

impl DownloadJob {
    /// New job without a size hint.
    pub fn new(id: impl Into<JobId>, url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            destination: destination.into(),
            expected_bytes: None,
        }
    }

    /// Attach a size hint.
    #[must_use]
    pub const fn with_expected_bytes(mut self, bytes: u64) -> Self {
        self.expected_bytes = Some(bytes);
        self
    }
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    /// Job key
    pub id: JobId,
    /// Current state
    pub state: JobState,
    /// Bytes written so far
    pub bytes_transferred: u64,
    /// Total size when known
    pub bytes_total: Option<u64>,
}

/// Completion barrier for a fixed number of jobs.
///
/// Exactly one of [`complete`](Self::complete) returning `Some` or
/// [`fail`](Self::fail) returning `true` ever happens per barrier.
#[derive(Debug)]
pub struct InstallBarrier {
    expected: usize,
    completed: AtomicUsize,
    settled: AtomicBool,
    results: DashMap<JobId, PathBuf>,
}

impl InstallBarrier {
    /// Barrier releasing after `expected` successful completions.
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            completed: AtomicUsize::new(0),
            settled: AtomicBool::new(false),
            results: DashMap::new(),
        }
    }

    /// Number of completions required.
    #[must_use]
    pub const fn expected_count(&self) -> usize {
        self.expected
    }

    /// Number of completions recorded so far.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    /// Whether the barrier has released or failed.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    /// Record a successful job.
    ///
    /// Returns every result exactly once: to the caller whose completion made
    /// the count reach the expected total, provided no failure settled first.
    pub fn complete(&self, id: JobId, path: PathBuf) -> Option<HashMap<JobId, PathBuf>> {
        self.results.insert(id, path);
        let done = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        if done == self.expected && self.try_settle() {
            return Some(self.take_results());
        }
        None
    }

    /// Record a failed job. Returns `true` only for the first settling event.
    pub fn fail(&self) -> bool {
        self.try_settle()
    }

    fn try_settle(&self) -> bool {
        self.settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn take_results(&self) -> HashMap<JobId, PathBuf> {
        let keys: Vec<JobId> = self.results.iter().map(|e| e.key().clone()).collect();
        keys.into_iter().filter_map(|k| self.results.remove(&k)).collect()
    }
}

/// Progress observer shared by all jobs: `(job_id, bytes_done, bytes_total)`.
pub type ProgressFn = Arc<dyn Fn(&str, u64, Option<u64>) + Send + Sync>;

type CompleteFn = Box<dyn FnOnce(HashMap<JobId, PathBuf>) + Send>;
type FailedFn = Box<dyn FnOnce(LauncherError) + Send>;

struct JobSlot {
    id: JobId,
    state: Mutex<JobState>,
    transferred: AtomicU64,
    total: Mutex<Option<u64>>,
    cancel: CancelToken,
}

impl JobSlot {
    fn set_state(&self, state: JobState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn status(&self) -> JobStatus {
        JobStatus {
            id: self.id.clone(),
            state: *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            bytes_transferred: self.transferred.load(Ordering::Acquire),
            bytes_total: *self.total.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

struct Shared {
    barrier: InstallBarrier,
    slots: Vec<JobSlot>,
    on_all_complete: Mutex<Option<CompleteFn>>,
    on_any_failed: Mutex<Option<FailedFn>>,
}

impl Shared {
    fn cancel_all(&self) {
        for slot in &self.slots {
            slot.cancel.cancel();
        }
    }

    fn fire_complete(&self, results: HashMap<JobId, PathBuf>) {
        let callback = self.on_all_complete.lock().unwrap_or_else(PoisonError::into_inner).take();
        self.on_any_failed.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(callback) = callback {
            callback(results);
        }
    }

    fn fire_failed(&self, error: LauncherError) {
        let callback = self.on_any_failed.lock().unwrap_or_else(PoisonError::into_inner).take();
        self.on_all_complete.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(callback) = callback {
            callback(error);
        }
    }
}

/// Runs a fixed set of downloads concurrently.
#[derive(Clone)]
pub struct DownloadCoordinator {
    fetcher: AssetFetcher,
    progress: Option<ProgressFn>,
    abort: Option<CancelToken>,
}

impl std::fmt::Debug for DownloadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadCoordinator")
            .field("fetcher", &self.fetcher)
            .field("progress", &self.progress.is_some())
            .field("abort", &self.abort)
            .finish()
    }
}

impl DownloadCoordinator {
    /// Coordinator using `fetcher` for every job.
    #[must_use]
    pub const fn new(fetcher: AssetFetcher) -> Self {
        Self {
            fetcher,
            progress: None,
            abort: None,
        }
    }

    /// Report per-job progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Cancel every job of [`download_all`](Self::download_all) once `abort` fires.
    #[must_use]
    pub fn with_abort(mut self, abort: CancelToken) -> Self {
        self.abort = Some(abort);
        self
    }

    /// Spawn one task per job and return immediately.
    ///
    /// Must be called from within a tokio runtime. With no jobs,
    /// `on_all_complete` runs synchronously with an empty map. Job ids key the
    /// result map, so a repeated id is refused before anything is spawned.
    pub fn start<C, F>(
        &self,
        jobs: Vec<DownloadJob>,
        on_all_complete: C,
        on_any_failed: F,
    ) -> Result<CoordinatorHandle>
    where
        C: FnOnce(HashMap<JobId, PathBuf>) + Send + 'static,
        F: FnOnce(LauncherError) + Send + 'static,
    {
        let mut ids = HashSet::new();
        if let Some(duplicate) = jobs.iter().find(|job| !ids.insert(job.id.as_str())) {
            return Err(LauncherError::Install {
                artifact: "downloads".to_string(),
                reason: format!("job id '{}' is used more than once", duplicate.id),
            });
        }

        let shared = Arc::new(Shared {
            barrier: InstallBarrier::new(jobs.len()),
            slots: jobs
                .iter()
                .map(|job| JobSlot {
                    id: job.id.clone(),
                    state: Mutex::new(JobState::Pending),
                    transferred: AtomicU64::new(0),
                    total: Mutex::new(job.expected_bytes),
                    cancel: CancelToken::new(),
                })
                .collect(),
            on_all_complete: Mutex::new(Some(Box::new(on_all_complete))),
            on_any_failed: Mutex::new(Some(Box::new(on_any_failed))),
        });

        if jobs.is_empty() {
            if shared.barrier.try_settle() {
                shared.fire_complete(HashMap::new());
            }
            return Ok(CoordinatorHandle {
                shared,
                tasks: Vec::new(),
            });
        }

        info!("Starting {} concurrent download(s)", jobs.len());
        let tasks = jobs
            .into_iter()
            .enumerate()
            .map(|(index, job)| {
                let shared = Arc::clone(&shared);
                let fetcher = self.fetcher.clone();
                let progress = self.progress.clone();
                tokio::spawn(run_job(shared, index, job, fetcher, progress))
            })
            .collect();

        Ok(CoordinatorHandle { shared, tasks })
    }

    /// Download every job and return all paths, or the first failure.
    pub async fn download_all(&self, jobs: Vec<DownloadJob>) -> Result<HashMap<JobId, PathBuf>> {
        let (tx, rx) = oneshot::channel();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let tx_failed = Arc::clone(&tx);

        let mut handle = self.start(
            jobs,
            move |results| send_once(&tx, Ok(results)),
            move |error| send_once(&tx_failed, Err(error)),
        )?;
        let joined = handle.join();
        tokio::pin!(joined);

        match &self.abort {
            Some(abort) => {
                tokio::select! {
                    () = &mut joined => {}
                    () = abort.cancelled() => {
                        if !handle.is_settled() {
                            warn!("Download aborted, cancelling remaining jobs");
                            handle.cancel_all();
                        }
                        joined.await;
                    }
                }
            }
            None => joined.await,
        }

        for job in handle.status() {
            debug!(
                "Job '{}' ended {:?} after {} of {:?} bytes",
                job.id, job.state, job.bytes_transferred, job.bytes_total
            );
        }

        rx.await.map_err(|_| LauncherError::Install {
            artifact: "downloads".to_string(),
            reason: "download coordinator stopped without a result".to_string(),
        })?
    }
}

fn send_once<T>(slot: &Mutex<Option<oneshot::Sender<T>>>, value: T) {
    if let Some(tx) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
        let _ = tx.send(value);
    }
}

async fn run_job(
    shared: Arc<Shared>,
    index: usize,
    job: DownloadJob,
    fetcher: AssetFetcher,
    progress: Option<ProgressFn>,
) {
    let slot = &shared.slots[index];
    slot.set_state(JobState::Running);
    debug!("Job '{}' started: {}", job.id, job.url);

    let hint = job.expected_bytes;
    let result = fetcher
        .fetch(
            &job.url,
            &job.destination,
            |done, total| {
                let total = total.or(hint);
                slot.transferred.store(done, Ordering::Release);
                *slot.total.lock().unwrap_or_else(PoisonError::into_inner) = total;
                if let Some(progress) = &progress {
                    progress(&job.id, done, total);
                }
            },
            &slot.cancel,
        )
        .await;

    match result {
        Ok(path) => {
            slot.set_state(JobState::Done);
            debug!("Job '{}' finished", job.id);
            if let Some(results) = shared.barrier.complete(job.id.clone(), path) {
                info!("All {} download(s) complete", shared.barrier.expected_count());
                shared.fire_complete(results);
            }
        }
        Err(error) => {
            let state = if matches!(error, LauncherError::Cancelled { .. }) {
                JobState::Cancelled
            } else {
                JobState::Failed
            };
            slot.set_state(state);

            if shared.barrier.fail() {
                warn!("Job '{}' failed, cancelling remaining downloads: {}", job.id, error);
                shared.cancel_all();
                shared.fire_failed(error);
            } else {
                debug!("Job '{}' ended after the barrier settled: {}", job.id, error);
            }
        }
    }
}

/// Handle to a running coordinator.
pub struct CoordinatorHandle {
    shared: Arc<Shared>,
    tasks: Vec<JoinHandle<()>>,
}

impl CoordinatorHandle {
    /// Signal every job to stop at its next check point.
    ///
    /// The first job to observe it reports [`LauncherError::Cancelled`]
    /// through `on_any_failed`, unless the barrier already released.
    pub fn cancel_all(&self) {
        self.shared.cancel_all();
    }

    /// Snapshot of every job.
    #[must_use]
    pub fn status(&self) -> Vec<JobStatus> {
        self.shared.slots.iter().map(JobSlot::status).collect()
    }

    /// Whether a continuation has fired.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.shared.barrier.is_settled()
    }

    /// Future waiting for every task to end.
    ///
    /// The future owns the tasks, so the handle stays usable for
    /// [`cancel_all`](Self::cancel_all) and [`status`](Self::status) while it
    /// runs. If a task died without reporting (panic), the failure
    /// continuation fires here so callers are never left waiting.
    pub fn join(&mut self) -> impl Future<Output = ()> + Send + 'static {
        let tasks = std::mem::take(&mut self.tasks);
        let shared = Arc::clone(&self.shared);
        async move {
            for result in join_all(tasks).await {
                if let Err(e) = result {
                    warn!("Download task terminated abnormally: {}", e);
                }
            }
            if shared.barrier.fail() {
                shared.fire_failed(LauncherError::Install {
                    artifact: "downloads".to_string(),
                    reason: "a download task terminated unexpectedly".to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barrier_releases_once_on_last_completion() {
        let barrier = InstallBarrier::new(2);
        assert!(barrier.complete("map".into(), PathBuf::from("/a")).is_none());
        assert_eq!(barrier.completed_count(), 1);

        let results = barrier.complete("rp".into(), PathBuf::from("/b")).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results["map"], PathBuf::from("/a"));
        assert!(barrier.is_settled());
        assert!(!barrier.fail());
    }

    #[test]
    fn test_barrier_failure_is_first_wins() {
        let barrier = InstallBarrier::new(3);
        assert!(barrier.complete("a".into(), PathBuf::from("/a")).is_none());
        assert!(barrier.fail());
        assert!(!barrier.fail());
        assert!(barrier.complete("b".into(), PathBuf::from("/b")).is_none());
        assert!(barrier.complete("c".into(), PathBuf::from("/c")).is_none());
    }

    #[test]
    fn test_job_state_terminal() {
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Done.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
    }

    #[tokio::test]
    async fn test_empty_job_list_completes_immediately() {
        let coordinator = DownloadCoordinator::new(AssetFetcher::new().unwrap());
        let results = coordinator.download_all(Vec::new()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_all_jobs_complete_fires_once() {
        let mut server = mockito::Server::new_async().await;
        let _map = server.mock("GET", "/map.zip").with_body("map-bytes").create_async().await;
        let _rp = server.mock("GET", "/rp.zip").with_body("rp-bytes").create_async().await;
        let dir = tempfile::tempdir().unwrap();

        let completions = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(HashMap::new()));

        let coordinator = DownloadCoordinator::new(AssetFetcher::new().unwrap());
        let jobs = vec![
            DownloadJob::new("map", format!("{}/map.zip", server.url()), dir.path().join("map.zip")),
            DownloadJob::new("rp", format!("{}/rp.zip", server.url()), dir.path().join("rp.zip")),
        ];

        let (c, f, s) = (Arc::clone(&completions), Arc::clone(&failures), Arc::clone(&seen));
        let mut handle = coordinator.start(
            jobs,
            move |results| {
                c.fetch_add(1, Ordering::SeqCst);
                *s.lock().unwrap() = results;
            },
            move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();
        handle.join().await;

        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert_eq!(failures.load(Ordering::SeqCst), 0);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(std::fs::read_to_string(&seen["map"]).unwrap(), "map-bytes");
        assert_eq!(std::fs::read_to_string(&seen["rp"]).unwrap(), "rp-bytes");
    }

    #[tokio::test]
    async fn test_second_failure_is_swallowed() {
        let mut server = mockito::Server::new_async().await;
        let _a = server.mock("GET", "/a").with_status(404).create_async().await;
        let _b = server.mock("GET", "/b").with_status(500).create_async().await;
        let dir = tempfile::tempdir().unwrap();

        let completions = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));

        let coordinator = DownloadCoordinator::new(AssetFetcher::new().unwrap());
        let jobs = vec![
            DownloadJob::new("a", format!("{}/a", server.url()), dir.path().join("a")),
            DownloadJob::new("b", format!("{}/b", server.url()), dir.path().join("b")),
        ];

        let (c, f) = (Arc::clone(&completions), Arc::clone(&failures));
        let mut handle = coordinator.start(
            jobs,
            move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            },
            move |error| {
                assert!(matches!(error, LauncherError::HttpStatus { .. }));
                f.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();
        handle.join().await;

        assert_eq!(completions.load(Ordering::SeqCst), 0);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert!(!dir.path().join("a").exists());
        assert!(!dir.path().join("b").exists());
    }

    #[tokio::test]
    async fn test_one_failure_blocks_completion() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server.mock("GET", "/ok").with_body("fine").create_async().await;
        let _bad = server.mock("GET", "/bad").with_status(404).create_async().await;
        let dir = tempfile::tempdir().unwrap();

        let coordinator = DownloadCoordinator::new(AssetFetcher::new().unwrap());
        let err = coordinator
            .download_all(vec![
                DownloadJob::new("ok", format!("{}/ok", server.url()), dir.path().join("ok")),
                DownloadJob::new("bad", format!("{}/bad", server.url()), dir.path().join("bad")),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_status_reports_progress() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("GET", "/f").with_body("0123456789").create_async().await;
        let dir = tempfile::tempdir().unwrap();

        let coordinator = DownloadCoordinator::new(AssetFetcher::new().unwrap());
        let mut handle = coordinator
            .start(
                vec![DownloadJob::new("f", format!("{}/f", server.url()), dir.path().join("f"))],
                |_| {},
                |_| {},
            )
            .unwrap();
        handle.join().await;

        assert!(handle.is_settled());
        let status = handle.status();
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].state, JobState::Done);
        assert_eq!(status[0].bytes_transferred, 10);
        assert_eq!(status[0].bytes_total, Some(10));
    }

    /// Serves a 1000 byte response that stops after its first 10 bytes.
    async fn stalled_server() -> (String, JoinHandle<()>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n0123456789")
                .await;
            let _ = socket.flush().await;
            std::future::pending::<()>().await;
        });
        (format!("http://{addr}/slow.zip"), task)
    }

    #[tokio::test]
    async fn test_failure_cancels_slow_sibling() {
        let mut server = mockito::Server::new_async().await;
        let _bad = server.mock("GET", "/map.zip").with_status(404).create_async().await;
        let (slow_url, stall) = stalled_server().await;
        let dir = tempfile::tempdir().unwrap();

        let completions = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));

        let coordinator = DownloadCoordinator::new(AssetFetcher::new().unwrap());
        let jobs = vec![
            DownloadJob::new("map", format!("{}/map.zip", server.url()), dir.path().join("map.zip")),
            DownloadJob::new("rp", slow_url, dir.path().join("rp.zip")),
        ];

        let (c, f) = (Arc::clone(&completions), Arc::clone(&failures));
        let mut handle = coordinator
            .start(
                jobs,
                move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                },
                move |error| {
                    assert!(matches!(error, LauncherError::HttpStatus { status: 404, .. }));
                    f.fetch_add(1, Ordering::SeqCst);
                },
            )
            .unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(10), handle.join())
            .await
            .unwrap();
        stall.abort();

        assert_eq!(completions.load(Ordering::SeqCst), 0);
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        let status = handle.status();
        assert_eq!(status[0].state, JobState::Failed);
        assert_eq!(status[1].state, JobState::Cancelled);
        assert!(!dir.path().join("rp.zip").exists());
        assert!(!dir.path().join("rp.zip.part").exists());
    }

    #[tokio::test]
    async fn test_duplicate_job_ids_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let fired = Arc::new(AtomicUsize::new(0));

        let coordinator = DownloadCoordinator::new(AssetFetcher::new().unwrap());
        let (c, f) = (Arc::clone(&fired), Arc::clone(&fired));
        let err = coordinator
            .start(
                vec![
                    DownloadJob::new("map", "http://127.0.0.1:9/a.zip", dir.path().join("a.zip")),
                    DownloadJob::new("map", "http://127.0.0.1:9/b.zip", dir.path().join("b.zip")),
                ],
                move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                },
                move |_| {
                    f.fetch_add(1, Ordering::SeqCst);
                },
            )
            .err()
            .unwrap();

        assert!(matches!(err, LauncherError::Install { ref reason, .. } if reason.contains("'map'")));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_abort_token_cancels_download_all() {
        let (slow_url, stall) = stalled_server().await;
        let dir = tempfile::tempdir().unwrap();

        let abort = CancelToken::new();
        let trigger = abort.clone();
        let coordinator = DownloadCoordinator::new(AssetFetcher::new().unwrap())
            .with_abort(abort)
            .with_progress(Arc::new(move |_, _, _| trigger.cancel()));

        let err = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            coordinator.download_all(vec![DownloadJob::new("rp", slow_url, dir.path().join("rp.zip"))]),
        )
        .await
        .unwrap()
        .unwrap_err();
        stall.abort();

        assert!(matches!(err, LauncherError::Cancelled { .. }));
        assert!(!dir.path().join("rp.zip").exists());
    }
}
