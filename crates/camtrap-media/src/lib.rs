//! Frame extraction and detector subprocess orchestration.
//!
//! This crate provides:
//! - FFprobe duration probing
//! - FFmpeg frame sampling with resolution-encoded renaming
//! - Invocation of the external detection process with line streaming
//! - Crop production from detection bounding boxes
//! - The overwrite-per-line progress status sink

pub mod detector;
pub mod error;
pub mod extract;
pub mod probe;
pub mod status;

pub use detector::{produce_crops, Detector, WildlifeDetector, CROPS_DIR_SUFFIX, DETECTION_OUTPUT_FILE};
pub use error::{MediaError, MediaResult};
pub use extract::{extract_frames, normalize_frames};
pub use probe::probe_duration;
pub use status::{StatusSink, StatusUpdate};
