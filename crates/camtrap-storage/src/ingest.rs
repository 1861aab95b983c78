//! Ingestion store capability.
//!
//! The remote location where newly captured camera files first appear. The
//! trait is the seam; the shipped implementation is filesystem-backed for
//! camera roots synced or mounted locally. Protocol clients (FTP and friends)
//! implement the same trait elsewhere.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageResult;

/// One listing entry, carrying the full path relative to the store root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestEntry {
    /// Path relative to the store root
    pub path: String,
    /// Size in bytes (zero for directories)
    pub size: u64,
    pub is_dir: bool,
}

/// Capability interface over the ingestion source.
///
/// Paths are `/`-separated keys relative to the store root, never absolute.
#[async_trait]
pub trait IngestStore: Send + Sync {
    /// List the direct children of `path` (empty string for the root).
    async fn list(&self, path: &str) -> StorageResult<Vec<IngestEntry>>;

    /// Read a file's full contents.
    async fn get(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Write a file, creating intermediate directories.
    async fn put(&self, path: &str, bytes: &[u8]) -> StorageResult<()>;

    /// Rename a file, creating intermediate directories at the destination.
    async fn rename(&self, from: &str, to: &str) -> StorageResult<()>;

    /// Delete a file.
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Create a directory, recursively.
    async fn make_dir(&self, path: &str) -> StorageResult<()>;
}

/// Filesystem-backed ingestion store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsIngestStore {
    root: PathBuf,
}

impl FsIngestStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl IngestStore for FsIngestStore {
    async fn list(&self, path: &str) -> StorageResult<Vec<IngestEntry>> {
        let dir = self.resolve(path);
        let mut entries = Vec::new();

        let mut read_dir = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let full = if path.is_empty() {
                name
            } else {
                format!("{}/{}", path.trim_end_matches('/'), name)
            };
            let metadata = entry.metadata().await?;
            entries.push(IngestEntry {
                path: full,
                size: if metadata.is_dir() { 0 } else { metadata.len() },
                is_dir: metadata.is_dir(),
            });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn get(&self, path: &str) -> StorageResult<Vec<u8>> {
        Ok(tokio::fs::read(self.resolve(path)).await?)
    }

    async fn put(&self, path: &str, bytes: &[u8]) -> StorageResult<()> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!("Ingest put: writing {} bytes to {}", bytes.len(), target.display());
        tokio::fs::write(target, bytes).await?;
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        let source = self.resolve(from);
        let target = self.resolve(to);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!("Ingest move: {} -> {}", source.display(), target.display());
        tokio::fs::rename(source, target).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        debug!("Ingest delete: {}", path);
        tokio::fs::remove_file(self.resolve(path)).await?;
        Ok(())
    }

    async fn make_dir(&self, path: &str) -> StorageResult<()> {
        tokio::fs::create_dir_all(self.resolve(path)).await?;
        Ok(())
    }
}
