//! Frame extraction from staged videos.
//!
//! A video is decomposed into numbered JPEG stills at a fixed sampling rate,
//! then each still is probed for its resolution and renamed to the
//! `{width}x{height}-{timestamp}.jpg` encoding the detector relies on.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use camtrap_models::frame::format_frame_name;

use crate::error::{MediaError, MediaResult};
use crate::probe::probe_duration;

/// Extract frames from `video` into `destination` at `fps` frames per second.
///
/// Returns the video duration in seconds. Fails with
/// [`MediaError::FrameExtractionFailed`] when FFmpeg errors and with
/// [`MediaError::NotEnoughFramesForAnalysis`] when FFmpeg succeeds but writes
/// no files. The destination directory is left in place on failure; removing
/// it is the caller's job.
pub async fn extract_frames(
    video: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    fps: f64,
) -> MediaResult<f64> {
    let video = video.as_ref();
    let destination = destination.as_ref();

    let duration = probe_duration(video).await?;

    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let pattern = destination.join("%05d.jpg");
    debug!(
        "Extracting frames: ffmpeg -i {} -vf fps={} {}",
        video.display(),
        fps,
        pattern.display()
    );

    let output = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-i"])
        .arg(video)
        .arg("-vf")
        .arg(format!("fps={}", fps))
        .arg(&pattern)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FrameExtractionFailed {
            video: video.to_path_buf(),
            destination: destination.to_path_buf(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let count = normalize_frames(destination, fps).await?;
    info!("Extracted {} frames from {}", count, video.display());

    Ok(duration)
}

/// Probe and rename every numbered frame in `destination`.
///
/// Files whose image metadata cannot be read are deleted and skipped. Returns
/// the number of frames that survived, failing with
/// [`MediaError::NotEnoughFramesForAnalysis`] when the directory was empty to
/// begin with.
pub async fn normalize_frames(destination: &Path, fps: f64) -> MediaResult<usize> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(destination).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        entries.push(entry.path());
    }
    entries.sort();

    if entries.is_empty() {
        return Err(MediaError::NotEnoughFramesForAnalysis(
            destination.to_path_buf(),
        ));
    }

    let mut kept = 0;
    for path in entries {
        let index: u64 = match path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse().ok())
        {
            Some(index) => index,
            // Not one of ours, leave it alone
            None => continue,
        };

        let (width, height) = match image::image_dimensions(&path) {
            Ok(dimensions) => dimensions,
            Err(error) => {
                warn!(
                    "Can not read image metadata for {}, removing: {}",
                    path.display(),
                    error
                );
                tokio::fs::remove_file(&path).await?;
                continue;
            }
        };

        let timestamp = index as f64 * (1.0 / fps);
        let renamed = destination.join(format_frame_name(width, height, timestamp));
        tokio::fs::rename(&path, &renamed).await?;
        kept += 1;
    }

    Ok(kept)
}
