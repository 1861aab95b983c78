//! Local staging of remote file contents.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::StorageResult;

/// Writes selected remote files into a local working directory.
#[derive(Debug, Clone)]
pub struct LocalStaging {
    dir: PathBuf,
}

impl LocalStaging {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist `bytes` under `filename` in the staging directory.
    pub async fn stage(&self, filename: &str, bytes: &[u8]) -> StorageResult<StagedVideo> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(filename);
        info!("Staging {} bytes at {}", bytes.len(), path.display());
        tokio::fs::write(&path, bytes).await?;

        Ok(StagedVideo { path })
    }
}

/// A staged working copy, owned by one processing cycle.
///
/// Created at most once per cycle and removed exactly once, on every
/// control-flow exit.
#[derive(Debug)]
pub struct StagedVideo {
    path: PathBuf,
}

impl StagedVideo {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the working copy. Failures are logged, not propagated, so
    /// cleanup never masks the cycle's real outcome.
    pub async fn remove(self) {
        if let Err(error) = tokio::fs::remove_file(&self.path).await {
            warn!(
                "Failed to remove staged file {}: {}",
                self.path.display(),
                error
            );
        }
    }
}
