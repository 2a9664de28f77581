use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;

pub const PATCHLIST_DIR: &str = "patchlist";
pub const WATERMARK_FILE: &str = "current.txt";

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("watermark file holds a non-integer value: {0:?}")]
    Corrupt(String),
}

/// The single persisted integer marking the highest patch version fully
/// applied. Lives at `<root>/patchlist/current.txt`.
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(PATCHLIST_DIR).join(WATERMARK_FILE),
        }
    }

    /// Reads the watermark, initializing the file to `0` when absent so a
    /// first run leaves a complete patchlist directory behind.
    pub async fn load(&self) -> Result<u64, WatermarkError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => parse_watermark(&text),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.store(0).await?;
                Ok(0)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Reads the watermark without touching the filesystem on absence.
    pub async fn current(&self) -> Result<u64, WatermarkError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => parse_watermark(&text),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    /// Durably advances the watermark: written to a temp sibling, fsynced,
    /// then renamed over `current.txt` so a crash mid-write cannot corrupt
    /// the previous value.
    pub async fn store(&self, version: u64) -> Result<(), WatermarkError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = self.path.with_extension("txt.tmp");
        let mut file = tokio::fs::File::create(&staging).await?;
        file.write_all(version.to_string().as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

fn parse_watermark(text: &str) -> Result<u64, WatermarkError> {
    let trimmed = text.trim();
    trimmed
        .parse::<u64>()
        .map_err(|_| WatermarkError::Corrupt(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn first_load_initializes_the_file_to_zero() {
        let dir = tempdir().unwrap();
        let store = WatermarkStore::new(dir.path());

        assert_eq!(store.load().await.unwrap(), 0);

        let written =
            std::fs::read_to_string(dir.path().join(PATCHLIST_DIR).join(WATERMARK_FILE)).unwrap();
        assert_eq!(written, "0");
    }

    #[tokio::test]
    async fn stored_value_survives_a_fresh_load() {
        let dir = tempdir().unwrap();
        let store = WatermarkStore::new(dir.path());

        store.store(42).await.unwrap();

        let reopened = WatermarkStore::new(dir.path());
        assert_eq!(reopened.load().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn current_does_not_create_the_file() {
        let dir = tempdir().unwrap();
        let store = WatermarkStore::new(dir.path());

        assert_eq!(store.current().await.unwrap(), 0);
        assert!(!dir.path().join(PATCHLIST_DIR).join(WATERMARK_FILE).exists());
    }

    #[tokio::test]
    async fn tolerates_surrounding_whitespace() {
        let dir = tempdir().unwrap();
        let patchlist = dir.path().join(PATCHLIST_DIR);
        std::fs::create_dir_all(&patchlist).unwrap();
        std::fs::write(patchlist.join(WATERMARK_FILE), "17\n").unwrap();

        let store = WatermarkStore::new(dir.path());
        assert_eq!(store.load().await.unwrap(), 17);
    }

    #[tokio::test]
    async fn garbage_content_is_an_error_not_a_reset() {
        let dir = tempdir().unwrap();
        let patchlist = dir.path().join(PATCHLIST_DIR);
        std::fs::create_dir_all(&patchlist).unwrap();
        std::fs::write(patchlist.join(WATERMARK_FILE), "not-a-number").unwrap();

        let store = WatermarkStore::new(dir.path());
        assert!(matches!(
            store.load().await,
            Err(WatermarkError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn store_leaves_no_staging_file_behind() {
        let dir = tempdir().unwrap();
        let store = WatermarkStore::new(dir.path());

        store.store(7).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path().join(PATCHLIST_DIR))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(WATERMARK_FILE)]);
    }
}
