//! Full result of running detection over one staged video.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::detection::DetectionFrame;

/// Everything produced by one detection run, owned by the orchestrator for
/// the duration of a cycle and then handed to persistence and archival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Video duration in seconds
    pub video_length: f64,
    /// Average detector time per frame in seconds
    pub avg_time: f64,
    /// Per-frame detections, annotated with resolution and timestamp
    pub frames: Vec<DetectionFrame>,
    /// Accumulated detector stdout
    pub output: String,
    /// Accumulated detector stderr
    pub errors: String,
    /// Crop filename to local path, one entry per detection
    pub crops: BTreeMap<String, PathBuf>,
}
