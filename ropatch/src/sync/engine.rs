use std::path::PathBuf;

use thiserror::Error;

use super::fetch::{FetchFailure, Fetcher};
use super::manifest::{PatchRecord, parse_manifest};
use super::paths::{PathError, local_path_for};
use super::plan::plan_updates;
use super::watermark::{PATCHLIST_DIR, WatermarkError, WatermarkStore};

const DEFAULT_REMOTE_PREFIX: &str = "/patch";
const DEFAULT_GATE_FILE: &str = "patch_allow.txt";
const DEFAULT_MANIFEST_FILE: &str = "patch2.txt";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchFailure),
    #[error("watermark error: {0}")]
    Watermark(#[from] WatermarkError),
    #[error("path error: {0}")]
    Path(#[from] PathError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the control files and packages live on the server.
#[derive(Debug, Clone)]
pub struct RemoteLayout {
    pub prefix: String,
    pub gate_file: String,
    pub manifest_file: String,
}

impl Default for RemoteLayout {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_REMOTE_PREFIX.to_string(),
            gate_file: DEFAULT_GATE_FILE.to_string(),
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
        }
    }
}

impl RemoteLayout {
    fn control_remote(&self, name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.prefix.trim_end_matches('/'),
            PATCHLIST_DIR,
            name
        )
    }

    fn package_remote(&self, filename: &str) -> String {
        format!(
            "{}/{}",
            self.prefix.trim_end_matches('/'),
            filename.trim_start_matches('/')
        )
    }
}

/// Terminal result of one sync session.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The server's gate file blocked the session. Clean exit, nothing
    /// fetched beyond the gate itself, watermark untouched.
    GateDenied,
    Completed { applied: usize, watermark: u64 },
}

/// What a session would do, without doing it.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionPlan {
    GateDenied,
    Pending {
        plan: Vec<PatchRecord>,
        watermark: u64,
    },
}

/// Orchestrates one sync session: gate check, manifest fetch, planning,
/// sequential application, watermark advancement.
///
/// The session is strictly sequential. Each applied record follows the
/// happens-before chain: file fully written and verified, then watermark
/// persisted, then the next record attempted. A crash between the file
/// write and the watermark write costs one redundant re-download on the
/// next run and nothing else.
pub struct SyncEngine {
    fetcher: Fetcher,
    watermark: WatermarkStore,
    root: PathBuf,
    layout: RemoteLayout,
}

impl SyncEngine {
    pub fn new(fetcher: Fetcher, watermark: WatermarkStore, root: PathBuf) -> Self {
        Self {
            fetcher,
            watermark,
            root,
            layout: RemoteLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: RemoteLayout) -> Self {
        self.layout = layout;
        self
    }

    pub async fn run_session(&self) -> Result<SessionOutcome, EngineError> {
        if !self.check_gate().await? {
            return Ok(SessionOutcome::GateDenied);
        }

        let mut watermark = self.watermark.load().await?;
        let plan = self.fetch_plan(watermark).await?;

        let mut applied = 0usize;
        for record in &plan {
            let remote = self.layout.package_remote(&record.filename);
            let target = local_path_for(&self.root, &record.filename)?;
            self.fetcher.fetch(&remote, &target).await?;
            // Commit point: the file is on disk, so this version is done.
            self.watermark.store(record.version).await?;
            watermark = record.version;
            applied += 1;
        }

        Ok(SessionOutcome::Completed { applied, watermark })
    }

    /// Gate check plus planning, with no downloads of package content and
    /// no watermark initialization. Backs the `--dry-run` mode.
    pub async fn plan_session(&self) -> Result<SessionPlan, EngineError> {
        if !self.check_gate().await? {
            return Ok(SessionPlan::GateDenied);
        }
        let watermark = self.watermark.current().await?;
        let plan = self.fetch_plan(watermark).await?;
        Ok(SessionPlan::Pending { plan, watermark })
    }

    async fn check_gate(&self) -> Result<bool, EngineError> {
        let content = self.fetch_control(&self.layout.gate_file).await?;
        Ok(gate_allows(&content))
    }

    async fn fetch_plan(&self, watermark: u64) -> Result<Vec<PatchRecord>, EngineError> {
        let manifest = self.fetch_control(&self.layout.manifest_file).await?;
        Ok(plan_updates(parse_manifest(&manifest), watermark))
    }

    // Control files are cached under <root>/patchlist/ and read back from
    // disk, so an operator can inspect what the server actually served.
    async fn fetch_control(&self, name: &str) -> Result<String, EngineError> {
        let remote = self.layout.control_remote(name);
        let local = self.root.join(PATCHLIST_DIR).join(name);
        self.fetcher.fetch(&remote, &local).await?;
        Ok(tokio::fs::read_to_string(&local).await?)
    }
}

/// Gate polarity: content containing "deny" (case-insensitive) blocks the
/// session; anything else allows it. The server's gate file normally reads
/// "allow", and an unreachable gate is already fatal at the fetch layer, so
/// default-allow only applies to reachable gates saying something else.
fn gate_allows(content: &str) -> bool {
    !content.to_ascii_lowercase().contains("deny")
}


#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
