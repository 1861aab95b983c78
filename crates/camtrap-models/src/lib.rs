//! Shared data models for the CamTrap pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Ingested camera files and filename parsing
//! - Detection frames and bounding boxes
//! - Crop geometry for detection thumbnails
//! - Metadata records handed to the persistence layer

pub mod crop;
pub mod detection;
pub mod file;
pub mod frame;
pub mod records;
pub mod report;

// Re-export common types
pub use crop::{compute_crop_rect, CropRect};
pub use detection::{Detection, DetectionCategory, DetectionFrame, DetectionOutput};
pub use file::{parse_ingest_filename, FileType, FilenameError, RemoteFile};
pub use frame::{format_frame_name, format_timestamp, parse_frame_path, FrameInfo};
pub use records::{FileRecord, FrameRecord, ReportRecord};
pub use report::DetectionReport;
