use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use ropatch_core::PatchServer;

use crate::sync::engine::{RemoteLayout, SessionOutcome, SessionPlan, SyncEngine};
use crate::sync::fetch::Fetcher;
use crate::sync::watermark::{PATCHLIST_DIR, WatermarkStore};

const DEFAULT_ROOT_DIR: &str = "ropatch";
const DEFAULT_REMOTE_PREFIX: &str = "/patch";
const DEFAULT_GATE_FILE: &str = "patch_allow.txt";
const DEFAULT_MANIFEST_FILE: &str = "patch2.txt";
const DEFAULT_MAX_RETRIES: u64 = 5;
const DEFAULT_RETRY_BASE_MS: u64 = 1000;

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub server_url: String,
    pub root: PathBuf,
    pub remote_prefix: String,
    pub gate_file: String,
    pub manifest_file: String,
    pub max_retries: u32,
    pub retry_base: Duration,
}

impl SessionConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let server_url =
            std::env::var("ROPATCH_SERVER_URL").context("ROPATCH_SERVER_URL is not set")?;
        let root = std::env::var("ROPATCH_ROOT")
            .ok()
            .map(|value| expand_with_home(&value))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_DIR));
        let remote_prefix = std::env::var("ROPATCH_REMOTE_PREFIX")
            .unwrap_or_else(|_| DEFAULT_REMOTE_PREFIX.to_string());
        let gate_file =
            std::env::var("ROPATCH_GATE_FILE").unwrap_or_else(|_| DEFAULT_GATE_FILE.to_string());
        let manifest_file = std::env::var("ROPATCH_MANIFEST_FILE")
            .unwrap_or_else(|_| DEFAULT_MANIFEST_FILE.to_string());
        let max_retries = read_u64_env("ROPATCH_MAX_RETRIES", DEFAULT_MAX_RETRIES) as u32;
        let retry_base =
            Duration::from_millis(read_u64_env("ROPATCH_RETRY_BASE_MS", DEFAULT_RETRY_BASE_MS));

        Ok(Self {
            server_url,
            root,
            remote_prefix,
            gate_file,
            manifest_file,
            max_retries,
            retry_base,
        })
    }
}

pub struct SessionRuntime {
    config: SessionConfig,
    engine: SyncEngine,
}

impl SessionRuntime {
    pub async fn bootstrap(config: SessionConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(config.root.join(PATCHLIST_DIR))
            .await
            .with_context(|| format!("failed to create local root at {:?}", config.root))?;

        let server = PatchServer::with_base_url(&config.server_url)
            .with_context(|| format!("invalid server url: {}", config.server_url))?;
        let fetcher =
            Fetcher::new(server).with_retry_policy(config.max_retries, config.retry_base);
        let watermark = WatermarkStore::new(&config.root);
        let engine = SyncEngine::new(fetcher, watermark, config.root.clone()).with_layout(
            RemoteLayout {
                prefix: config.remote_prefix.clone(),
                gate_file: config.gate_file.clone(),
                manifest_file: config.manifest_file.clone(),
            },
        );

        Ok(Self { config, engine })
    }

    /// Runs one full sync session to completion or fatal abort.
    pub async fn run(&self) -> anyhow::Result<()> {
        eprintln!(
            "[ropatch] started: server={}, root={}",
            self.config.server_url,
            self.config.root.display()
        );

        match self.engine.run_session().await? {
            SessionOutcome::GateDenied => {
                eprintln!("[ropatch] server gate denies patching; nothing to do");
            }
            SessionOutcome::Completed { applied, watermark } => {
                eprintln!("[ropatch] applied {applied} update(s), watermark {watermark}");
            }
        }
        Ok(())
    }

    /// Prints what a session would apply, applying nothing.
    pub async fn run_dry(&self) -> anyhow::Result<()> {
        match self.engine.plan_session().await? {
            SessionPlan::GateDenied => {
                eprintln!("[ropatch] server gate denies patching; nothing would be applied");
            }
            SessionPlan::Pending { plan, watermark } => {
                for record in &plan {
                    eprintln!("[ropatch] pending: {} {}", record.version, record.filename);
                }
                eprintln!(
                    "[ropatch] {} update(s) pending, watermark {watermark}",
                    plan.len()
                );
            }
        }
        Ok(())
    }
}

fn expand_with_home(value: &str) -> PathBuf {
    let Some(home) = dirs::home_dir() else {
        return PathBuf::from(value);
    };
    expand_with(value, &home)
}

fn expand_with(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

fn read_u64_env(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}
