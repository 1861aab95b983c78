//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during frame extraction and detection.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Detector interpreter not found: {0}")]
    InterpreterNotFound(PathBuf),

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Frame extraction of {video} failed")]
    FrameExtractionFailed {
        video: PathBuf,
        destination: PathBuf,
        stderr: Option<String>,
    },

    #[error("No frames extracted into {0}")]
    NotEnoughFramesForAnalysis(PathBuf),

    #[error("Detection over {frame_dir} failed with exit code {exit_code}")]
    DetectionFailed {
        frame_dir: PathBuf,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Detector process exited abnormally: {message}")]
    DetectorProcessFailed { message: String },

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Frame name error: {0}")]
    FrameName(#[from] camtrap_models::frame::FrameNameError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// True for failures that route the source video to the skipped partition
    /// instead of aborting the worker cycle outright.
    pub fn is_skip_recoverable(&self) -> bool {
        matches!(
            self,
            MediaError::FrameExtractionFailed { .. } | MediaError::NotEnoughFramesForAnalysis(_)
        )
    }
}
