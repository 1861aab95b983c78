//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during ingestion, staging and migration.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No file found under {0:?}")]
    NoFileFound(String),

    #[error("File {0} is already in the skipped partition")]
    AlreadySkipped(String),

    #[error("Invalid file path: {0}")]
    InvalidFilePath(#[from] camtrap_models::file::FilenameError),

    #[error("Selection gave up after {attempts} attempts")]
    SelectionExhausted { attempts: usize },

    #[error("Failed to configure storage client: {0}")]
    ConfigError(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Archive bucket is empty")]
    ArchiveEmpty,

    #[error("Content of object {0} is empty")]
    EmptyObject(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("AWS SDK error: {0}")]
    AwsSdk(String),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn delete_failed(msg: impl Into<String>) -> Self {
        Self::DeleteFailed(msg.into())
    }
}
