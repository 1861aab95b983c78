//! Records handed to the external metadata store.
//!
//! The persistence layer is an external collaborator reached through a narrow
//! save contract. Relations are expressed with explicit integer-id foreign
//! keys rather than object graphs.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::detection::{Detection, DetectionCategory};
use crate::file::{FileType, RemoteFile};

/// One ingested file, stored once per processed video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Original path in the ingestion store
    pub path: String,
    pub captured: NaiveDateTime,
    pub file_type: FileType,
    /// Size in bytes
    pub size: u64,
    /// Video duration in seconds, when known
    pub length_secs: Option<f64>,
    /// Camera name
    pub source: String,
}

impl FileRecord {
    /// Build a record from selection metadata plus the probed duration.
    pub fn from_remote(file: &RemoteFile, length_secs: f64) -> Self {
        Self {
            path: file.path.clone(),
            captured: file.captured,
            file_type: file.file_type,
            size: file.size,
            length_secs: Some(length_secs),
            source: file.source.clone(),
        }
    }
}

/// One detection run over a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Id returned by storing the owning [`FileRecord`]
    pub file_id: i64,
    /// Average detector time per frame in milliseconds
    pub avg_time_per_frame_ms: f64,
    /// Wall-clock duration of the whole run in milliseconds
    pub duration_ms: f64,
    /// Detector stdout, truncated to the persistence limit
    pub output: String,
    /// Detector stderr, truncated to the persistence limit
    pub errors: String,
}

/// One analyzed frame belonging to a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Id returned by storing the owning [`ReportRecord`]
    pub report_id: i64,
    /// Frame image path given to the detector
    pub file: String,
    /// Offset into the video in seconds
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
    pub detections: Vec<Detection>,
    pub max_detection_confidence: f64,
    /// Distinct categories seen in this frame
    pub detected_categories: Vec<DetectionCategory>,
}
