use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ropatch_core::{PatchServer, ServerError};
use thiserror::Error;

use super::backoff::Backoff;

const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("remote path is empty")]
    EmptyRemotePath,
    #[error("remote resource not found: {remote}")]
    NotFound { remote: String },
    #[error("retries exhausted after {attempts} attempts for {remote}: {source}")]
    RetriesExhausted {
        remote: String,
        attempts: u32,
        #[source]
        source: ServerError,
    },
    #[error("downloaded file {remote} failed verification: expected {expected} bytes, found {found}")]
    SizeMismatch {
        remote: String,
        expected: u64,
        found: u64,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of one successful fetch, for operator reporting.
#[derive(Debug, Clone, Copy)]
pub struct FetchReport {
    pub size_bytes: u64,
    pub elapsed: Duration,
}

/// Sink for per-attempt progress. Operators watch these lines to gauge the
/// progress of large batch syncs, so the callbacks fire on every attempt,
/// not just terminal outcomes.
pub trait ProgressReporter: Send + Sync {
    fn fetch_started(&self, remote: &str);
    fn fetch_retrying(&self, remote: &str, attempt: u32, delay: Duration);
    fn fetch_completed(&self, remote: &str, report: &FetchReport);
    fn fetch_failed(&self, remote: &str, reason: &str);
}

/// Prints `[ropatch]`-prefixed progress lines to stderr.
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn fetch_started(&self, remote: &str) {
        eprintln!("[ropatch] downloading {remote}");
    }

    fn fetch_retrying(&self, remote: &str, attempt: u32, delay: Duration) {
        eprintln!(
            "[ropatch] download failed: {remote}; retry {attempt} in {:.1}s",
            delay.as_secs_f64()
        );
    }

    fn fetch_completed(&self, remote: &str, report: &FetchReport) {
        eprintln!(
            "[ropatch] done: {remote} ({:.2} KiB, {:.2}s)",
            report.size_bytes as f64 / 1024.0,
            report.elapsed.as_secs_f64()
        );
    }

    fn fetch_failed(&self, remote: &str, reason: &str) {
        eprintln!("[ropatch] giving up on {remote}: {reason}");
    }
}

/// Wraps a single remote fetch in a bounded retry loop.
///
/// NotFound fails immediately: the manifest names something the server does
/// not have, which no amount of retrying will fix. Everything else is
/// retried with linear backoff up to the ceiling, then surfaced as
/// `RetriesExhausted` so a persistent outage reaches an operator instead of
/// being swallowed.
pub struct Fetcher {
    server: PatchServer,
    backoff: Backoff,
    max_retries: u32,
    reporter: Arc<dyn ProgressReporter>,
}

impl Fetcher {
    pub fn new(server: PatchServer) -> Self {
        Self {
            server,
            backoff: Backoff::new(DEFAULT_RETRY_BASE),
            max_retries: DEFAULT_MAX_RETRIES,
            reporter: Arc::new(ConsoleReporter),
        }
    }

    pub fn with_retry_policy(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff = Backoff::new(base_delay);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub async fn fetch(&self, remote: &str, target: &Path) -> Result<FetchReport, FetchFailure> {
        if remote.is_empty() {
            return Err(FetchFailure::EmptyRemotePath);
        }

        self.reporter.fetch_started(remote);
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            match self.server.download_to_path(remote, target).await {
                Ok(written) => {
                    let report = self.verify(remote, target, written, started.elapsed()).await?;
                    self.reporter.fetch_completed(remote, &report);
                    return Ok(report);
                }
                Err(err) if err.is_not_found() => {
                    self.reporter.fetch_failed(remote, "not found on server");
                    return Err(FetchFailure::NotFound {
                        remote: remote.to_string(),
                    });
                }
                Err(err) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        self.reporter.fetch_failed(remote, "maximum retries exceeded");
                        return Err(FetchFailure::RetriesExhausted {
                            remote: remote.to_string(),
                            attempts: attempt,
                            source: err,
                        });
                    }
                    let delay = self.backoff.delay(attempt);
                    self.reporter.fetch_retrying(remote, attempt, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    // The watermark only ever advances past a file that demonstrably exists
    // on disk at its full size.
    async fn verify(
        &self,
        remote: &str,
        target: &Path,
        written: u64,
        elapsed: Duration,
    ) -> Result<FetchReport, FetchFailure> {
        let metadata = tokio::fs::metadata(target).await?;
        if metadata.len() != written {
            return Err(FetchFailure::SizeMismatch {
                remote: remote.to_string(),
                expected: written,
                found: metadata.len(),
            });
        }
        Ok(FetchReport {
            size_bytes: written,
            elapsed,
        })
    }
}
