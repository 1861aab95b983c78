//! Selection and validation of new files on the ingestion source.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use camtrap_models::file::{parse_ingest_filename, FileType, FilenameError, RemoteFile};

use crate::error::{StorageError, StorageResult};
use crate::ingest::{IngestEntry, IngestStore};
use crate::migrate::{move_to_skipped, SKIPPED_PREFIX};

/// Upper bound on skip-and-retry rounds within one selection call. The
/// candidate pool shrinks with every skip, so this only triggers when the
/// store keeps producing fresh invalid files.
const MAX_SELECT_ATTEMPTS: usize = 32;

/// A validated selection together with its downloaded contents.
#[derive(Debug, Clone)]
pub struct IngestedFile {
    pub metadata: RemoteFile,
    pub body: Vec<u8>,
}

/// Why a candidate was routed to the skipped partition.
#[derive(Debug, Clone)]
pub enum SkipReason {
    NotVideo(FileType),
    DeniedSource,
    InvalidPath(FilenameError),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotVideo(file_type) => write!(f, "not a video ({:?})", file_type),
            SkipReason::DeniedSource => write!(f, "camera source is denylisted"),
            SkipReason::InvalidPath(error) => write!(f, "{}", error),
        }
    }
}

/// Outcome of classifying one candidate.
#[derive(Debug, Clone)]
pub enum Selection {
    Accept(RemoteFile),
    Skip { path: String, reason: SkipReason },
}

/// Picks the next analyzable file from the ingestion store.
pub struct RemoteFileSelector {
    store: Arc<dyn IngestStore>,
    deny_sources: Vec<String>,
    retry_pause: Duration,
}

impl RemoteFileSelector {
    pub fn new(store: Arc<dyn IngestStore>) -> Self {
        Self {
            store,
            deny_sources: Vec::new(),
            retry_pause: Duration::from_secs(1),
        }
    }

    /// Camera sources whose files are skipped without analysis. Matched as
    /// path substrings, so camera directories work too.
    pub fn with_deny_sources(mut self, sources: Vec<String>) -> Self {
        self.deny_sources = sources;
        self
    }

    /// Pause between skip-and-retry rounds, to avoid hammering the store.
    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause = pause;
        self
    }

    /// Depth-first first-match over the store listing. Directories are
    /// entered in listing order; subtrees without files are passed over.
    pub async fn select_next(&self) -> StorageResult<IngestEntry> {
        self.first_file(String::new()).await
    }

    fn first_file(
        &self,
        dir: String,
    ) -> Pin<Box<dyn Future<Output = StorageResult<IngestEntry>> + Send + '_>> {
        Box::pin(async move {
            let entries = self.store.list(&dir).await?;

            for entry in entries {
                if entry.is_dir {
                    match self.first_file(entry.path).await {
                        Ok(found) => return Ok(found),
                        // Empty subtree, keep looking at the siblings
                        Err(_) => continue,
                    }
                } else {
                    return Ok(entry);
                }
            }

            Err(StorageError::NoFileFound(dir))
        })
    }

    /// Select the next valid video, skipping everything else.
    ///
    /// Non-videos, denylisted sources and unparsable filenames are moved to
    /// the skipped partition and selection retries after a short pause. A
    /// candidate already under the skipped partition fails immediately with
    /// [`StorageError::AlreadySkipped`]; an exhausted store fails with
    /// [`StorageError::NoFileFound`].
    pub async fn select_validated(&self) -> StorageResult<IngestedFile> {
        for _ in 0..MAX_SELECT_ATTEMPTS {
            let entry = self.select_next().await?;

            if entry.path.contains(SKIPPED_PREFIX) {
                return Err(StorageError::AlreadySkipped(entry.path));
            }

            match self.classify(&entry) {
                Selection::Accept(metadata) => {
                    info!("Selected file {} ({} bytes)", metadata.path, metadata.size);
                    let body = self.store.get(&metadata.path).await?;
                    return Ok(IngestedFile { metadata, body });
                }
                Selection::Skip { path, reason } => {
                    info!("Skipping {}: {}", path, reason);
                    move_to_skipped(self.store.as_ref(), &path).await?;
                    tokio::time::sleep(self.retry_pause).await;
                }
            }
        }

        Err(StorageError::SelectionExhausted {
            attempts: MAX_SELECT_ATTEMPTS,
        })
    }

    fn classify(&self, entry: &IngestEntry) -> Selection {
        let (source, captured) = match parse_ingest_filename(&entry.path) {
            Ok(parsed) => parsed,
            Err(error) => {
                return Selection::Skip {
                    path: entry.path.clone(),
                    reason: SkipReason::InvalidPath(error),
                }
            }
        };

        let file_type = FileType::from_path(&entry.path);
        if file_type != FileType::Video {
            return Selection::Skip {
                path: entry.path.clone(),
                reason: SkipReason::NotVideo(file_type),
            };
        }

        if self.deny_sources.iter().any(|deny| entry.path.contains(deny.as_str())) {
            return Selection::Skip {
                path: entry.path.clone(),
                reason: SkipReason::DeniedSource,
            };
        }

        Selection::Accept(RemoteFile {
            path: entry.path.clone(),
            size: entry.size,
            file_type,
            source,
            captured,
        })
    }
}
