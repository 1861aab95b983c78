//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Storage error: {0}")]
    Storage(#[from] camtrap_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] camtrap_media::MediaError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] crate::metadata::MetadataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    /// True when selection only found files already parked in the skipped
    /// partition. The scheduler logs these quietly.
    pub fn is_already_skipped(&self) -> bool {
        matches!(
            self,
            WorkerError::Storage(camtrap_storage::StorageError::AlreadySkipped(_))
        )
    }
}
