//! Movement of files between storage tiers.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::ingest::IngestStore;
use crate::object_store::ObjectStore;

/// Partition under the ingestion source for files excluded from analysis.
/// Named so it sorts behind the live camera directories.
pub const SKIPPED_PREFIX: &str = "z_skipped";

/// Listing batch used when picking a backfill candidate.
const BACKFILL_LIST_LIMIT: i32 = 3;

/// Path of a file once parked in the skipped partition.
pub fn skipped_path(path: &str) -> String {
    format!("{}/{}", SKIPPED_PREFIX, path.trim_start_matches('/'))
}

/// Rename a file into the skipped partition, creating intermediate
/// directories.
pub async fn move_to_skipped(store: &dyn IngestStore, path: &str) -> StorageResult<()> {
    let target = skipped_path(path);
    info!("Moving {} to skipped partition at {}", path, target);
    store.rename(path, &target).await
}

/// Moves files between the ingestion source, the skipped partition and the
/// archive bucket.
pub struct StorageMigrator {
    ingest: Arc<dyn IngestStore>,
    archive: Arc<dyn ObjectStore>,
}

impl StorageMigrator {
    pub fn new(ingest: Arc<dyn IngestStore>, archive: Arc<dyn ObjectStore>) -> Self {
        Self { ingest, archive }
    }

    /// Rename `path` into the skipped partition.
    pub async fn move_to_skipped(&self, path: &str) -> StorageResult<()> {
        move_to_skipped(self.ingest.as_ref(), path).await
    }

    /// Transfer one archived file back into the ingestion source.
    ///
    /// Fails loudly when the archive bucket is empty or the object has no
    /// content; the scheduler treats those as best-effort.
    pub async fn backfill(&self) -> StorageResult<()> {
        let mut objects = self.archive.list("", Some(BACKFILL_LIST_LIMIT)).await?;
        debug!("Found {} candidates in the archive bucket", objects.len());

        let object = objects.pop().ok_or(StorageError::ArchiveEmpty)?;
        info!("Selected {} for backfill into the ingestion source", object.key);

        let bytes = self.archive.get(&object.key).await?;
        if bytes.is_empty() {
            return Err(StorageError::EmptyObject(object.key));
        }

        self.ingest.put(&object.key, &bytes).await?;
        self.archive.delete(std::slice::from_ref(&object.key)).await?;

        info!("Backfilled {} into the ingestion source", object.key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::FsIngestStore;
    use crate::memory::MemoryObjectStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn backfill_moves_one_object_into_the_ingest_store() {
        let dir = TempDir::new().unwrap();
        let ingest = Arc::new(FsIngestStore::new(dir.path()));
        let archive = Arc::new(
            MemoryObjectStore::new()
                .with_object("Camera1_20230615143000.mp4", b"video".to_vec()),
        );

        let migrator = StorageMigrator::new(ingest.clone(), archive.clone());
        migrator.backfill().await.unwrap();

        assert_eq!(
            ingest.get("Camera1_20230615143000.mp4").await.unwrap(),
            b"video"
        );
        assert!(archive.is_empty());
    }

    #[tokio::test]
    async fn backfill_fails_loudly_on_empty_archive() {
        let dir = TempDir::new().unwrap();
        let ingest = Arc::new(FsIngestStore::new(dir.path()));
        let archive = Arc::new(MemoryObjectStore::new());

        let migrator = StorageMigrator::new(ingest, archive);
        assert!(matches!(
            migrator.backfill().await,
            Err(StorageError::ArchiveEmpty)
        ));
    }

    #[tokio::test]
    async fn backfill_rejects_empty_object_bodies() {
        let dir = TempDir::new().unwrap();
        let ingest = Arc::new(FsIngestStore::new(dir.path()));
        let archive =
            Arc::new(MemoryObjectStore::new().with_object("empty.mp4", Vec::new()));

        let migrator = StorageMigrator::new(ingest, archive.clone());
        assert!(matches!(
            migrator.backfill().await,
            Err(StorageError::EmptyObject(_))
        ));
        // The broken object stays put for an operator to look at
        assert!(archive.contains("empty.mp4"));
    }

    #[tokio::test]
    async fn move_to_skipped_prefixes_the_original_path() {
        let dir = TempDir::new().unwrap();
        let ingest = Arc::new(FsIngestStore::new(dir.path()));
        ingest.put("cam/a.mp4", b"data").await.unwrap();

        let migrator =
            StorageMigrator::new(ingest.clone(), Arc::new(MemoryObjectStore::new()));
        migrator.move_to_skipped("cam/a.mp4").await.unwrap();

        assert!(ingest.get("z_skipped/cam/a.mp4").await.is_ok());
        assert!(ingest.get("cam/a.mp4").await.is_err());
    }

    #[test]
    fn skipped_path_normalizes_leading_slash() {
        assert_eq!(skipped_path("/cam/a.mp4"), "z_skipped/cam/a.mp4");
        assert_eq!(skipped_path("cam/a.mp4"), "z_skipped/cam/a.mp4");
    }
}
