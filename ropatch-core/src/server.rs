use std::io;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server returned {status} for {remote}")]
    Status { status: StatusCode, remote: String },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// How a failed fetch should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchClass {
    /// The resource does not exist on the server; retrying cannot help.
    NotFound,
    /// Anything else: timeouts, resets, server errors.
    Transient,
}

impl ServerError {
    pub fn classification(&self) -> FetchClass {
        match self {
            ServerError::Status { status, .. }
                if matches!(*status, StatusCode::NOT_FOUND | StatusCode::GONE) =>
            {
                FetchClass::NotFound
            }
            _ => FetchClass::Transient,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.classification() == FetchClass::NotFound
    }
}

#[derive(Clone)]
pub struct PatchServer {
    http: Client,
    base_url: Url,
}

impl PatchServer {
    pub fn with_base_url(base_url: &str) -> Result<Self, ServerError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn with_http(http: Client, base_url: &str) -> Result<Self, ServerError> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
        })
    }

    /// Streams the remote resource into `target`, returning the byte count.
    ///
    /// The body is written to a `.partial` sibling and renamed over the
    /// target once fully flushed, so an interrupted attempt never leaves a
    /// torn file at the final path and every attempt fully replaces any
    /// previous content.
    pub async fn download_to_path(
        &self,
        remote_path: &str,
        target: &Path,
    ) -> Result<u64, ServerError> {
        let url = self.endpoint(remote_path)?;
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ServerError::Status {
                status: response.status(),
                remote: remote_path.to_string(),
            });
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial = partial_path(target);
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(partial, target).await?;
        Ok(written)
    }

    fn endpoint(&self, remote_path: &str) -> Result<Url, ServerError> {
        Ok(self.base_url.join(remote_path)?)
    }
}

fn partial_path(target: &Path) -> PathBuf {
    target.with_extension(format!(
        "{}partial",
        target
            .extension()
            .map(|ext| format!("{}.", ext.to_string_lossy()))
            .unwrap_or_default()
    ))
}
