//! Progress status sink for external observers.
//!
//! The detector's latest progress line is mirrored to a well-known file as a
//! small JSON document. The file is overwritten on every update, so outside
//! readers always see only the most recent line.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// The JSON document written on every progress update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Latest detector output line
    pub message: String,
    /// Frames directory currently being analyzed
    pub frame_dir: PathBuf,
    /// Duration of the video under analysis in seconds
    pub video_length: f64,
}

/// Writes the latest [`StatusUpdate`] to a fixed path.
#[derive(Debug, Clone)]
pub struct StatusSink {
    path: PathBuf,
}

impl StatusSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Overwrite the status file with the given update. Failures are logged
    /// and swallowed so a broken observer file never stalls detection.
    pub fn update(&self, update: &StatusUpdate) {
        let payload = match serde_json::to_vec(update) {
            Ok(payload) => payload,
            Err(error) => {
                warn!("Failed to encode status update: {}", error);
                return;
            }
        };

        if let Err(error) = std::fs::write(&self.path, payload) {
            warn!(
                "Failed to write status file {}: {}",
                self.path.display(),
                error
            );
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
