//! The external metadata persistence contract.
//!
//! The relational store behind the dashboard is an external collaborator;
//! the pipeline only needs this narrow save contract. Ids returned by the
//! store become foreign keys on dependent records.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use camtrap_models::records::{FileRecord, FrameRecord, ReportRecord};

pub type MetadataResult<T> = Result<T, MetadataError>;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Metadata backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Narrow save contract with the metadata store.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Store an ingested file, returning its id.
    async fn store_file(&self, file: FileRecord) -> MetadataResult<i64>;

    /// Store a detection report, returning its id.
    async fn store_report(&self, report: ReportRecord) -> MetadataResult<i64>;

    /// Store the frames belonging to a report.
    async fn store_frames(&self, frames: Vec<FrameRecord>) -> MetadataResult<()>;
}

/// In-memory metadata store, used by tests.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    inner: Mutex<MemoryTables>,
}

#[derive(Debug, Default)]
struct MemoryTables {
    files: Vec<FileRecord>,
    reports: Vec<ReportRecord>,
    frames: Vec<FrameRecord>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> Vec<FileRecord> {
        self.inner.lock().unwrap().files.clone()
    }

    pub fn reports(&self) -> Vec<ReportRecord> {
        self.inner.lock().unwrap().reports.clone()
    }

    pub fn frames(&self) -> Vec<FrameRecord> {
        self.inner.lock().unwrap().frames.clone()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn store_file(&self, file: FileRecord) -> MetadataResult<i64> {
        let mut inner = self.inner.lock().unwrap();
        inner.files.push(file);
        Ok(inner.files.len() as i64)
    }

    async fn store_report(&self, report: ReportRecord) -> MetadataResult<i64> {
        let mut inner = self.inner.lock().unwrap();
        inner.reports.push(report);
        Ok(inner.reports.len() as i64)
    }

    async fn store_frames(&self, frames: Vec<FrameRecord>) -> MetadataResult<()> {
        self.inner.lock().unwrap().frames.extend(frames);
        Ok(())
    }
}

/// Append-only JSON-lines metadata store.
///
/// One line per record, tagged with its kind. Ids are unique within one
/// worker run; an external importer reconciles them into the real database.
#[derive(Debug)]
pub struct JsonlMetadataStore {
    path: PathBuf,
    next_id: Mutex<i64>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JsonlRecord<'a> {
    File { id: i64, record: &'a FileRecord },
    Report { id: i64, record: &'a ReportRecord },
    Frame { record: &'a FrameRecord },
}

impl JsonlMetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            next_id: Mutex::new(1),
        }
    }

    fn allocate_id(&self) -> i64 {
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        id
    }

    async fn append(&self, record: &JsonlRecord<'_>) -> MetadataResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for JsonlMetadataStore {
    async fn store_file(&self, file: FileRecord) -> MetadataResult<i64> {
        let id = self.allocate_id();
        self.append(&JsonlRecord::File { id, record: &file }).await?;
        Ok(id)
    }

    async fn store_report(&self, report: ReportRecord) -> MetadataResult<i64> {
        let id = self.allocate_id();
        self.append(&JsonlRecord::Report { id, record: &report }).await?;
        Ok(id)
    }

    async fn store_frames(&self, frames: Vec<FrameRecord>) -> MetadataResult<()> {
        for frame in &frames {
            self.append(&JsonlRecord::Frame { record: frame }).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camtrap_models::file::{FileType, RemoteFile};
    use tempfile::TempDir;

    fn sample_file() -> FileRecord {
        let remote = RemoteFile {
            path: "Camera1_20230615143000.mp4".to_string(),
            size: 100,
            file_type: FileType::Video,
            source: "Camera1".to_string(),
            captured: chrono::NaiveDate::from_ymd_opt(2023, 6, 15)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap(),
        };
        FileRecord::from_remote(&remote, 12.0)
    }

    #[tokio::test]
    async fn memory_store_assigns_sequential_ids() {
        let store = MemoryMetadataStore::new();
        assert_eq!(store.store_file(sample_file()).await.unwrap(), 1);
        assert_eq!(store.store_file(sample_file()).await.unwrap(), 2);
        assert_eq!(store.files().len(), 2);
    }

    #[tokio::test]
    async fn jsonl_store_appends_tagged_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.jsonl");
        let store = JsonlMetadataStore::new(&path);

        let file_id = store.store_file(sample_file()).await.unwrap();
        let report_id = store
            .store_report(ReportRecord {
                file_id,
                avg_time_per_frame_ms: 420.0,
                duration_ms: 9000.0,
                output: "ok".to_string(),
                errors: String::new(),
            })
            .await
            .unwrap();
        assert_eq!((file_id, report_id), (1, 2));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "file");
        assert_eq!(first["record"]["source"], "Camera1");

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["kind"], "report");
        assert_eq!(second["record"]["file_id"], 1);
    }
}
