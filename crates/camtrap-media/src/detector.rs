//! External detection subprocess orchestration.
//!
//! The detector is an opaque external process invoked with a single argument,
//! the frames directory. It writes `output.json` into that directory on
//! success; everything it prints is advisory progress text that gets mirrored
//! to the status sink line by line.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use camtrap_models::crop::compute_crop_rect;
use camtrap_models::detection::DetectionOutput;
use camtrap_models::frame::{format_timestamp, parse_frame_path};
use camtrap_models::report::DetectionReport;

use crate::error::{MediaError, MediaResult};
use crate::extract::extract_frames;
use crate::status::{StatusSink, StatusUpdate};

/// Result file the detector writes into the frames directory.
pub const DETECTION_OUTPUT_FILE: &str = "output.json";

/// Suffix of the directory holding cropped detection images.
pub const CROPS_DIR_SUFFIX: &str = "-crops";

/// Seam between the orchestrator and the detection subprocess.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Run detection over one staged video, returning the full report with
    /// crop images already written beside the video.
    async fn run(&self, video: &Path) -> MediaResult<DetectionReport>;
}

/// Runs the wildlife detection script over extracted frames.
pub struct WildlifeDetector {
    interpreter: PathBuf,
    script: PathBuf,
    status: StatusSink,
    fps: f64,
    crop_border: u32,
}

impl WildlifeDetector {
    pub fn new(
        interpreter: impl Into<PathBuf>,
        script: impl Into<PathBuf>,
        status: StatusSink,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
            status,
            fps: 1.0,
            crop_border: 100,
        }
    }

    /// Frame sampling rate handed to the extractor.
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    /// Border in pixels added around every detection crop.
    pub fn with_crop_border(mut self, border: u32) -> Self {
        self.crop_border = border;
        self
    }

    async fn run_detector_process(
        &self,
        frame_dir: &Path,
        video_length: f64,
    ) -> MediaResult<(i32, String, String)> {
        if !self.interpreter.exists() {
            return Err(MediaError::InterpreterNotFound(self.interpreter.clone()));
        }

        debug!(
            "Spawning detector: {} {} {}",
            self.interpreter.display(),
            self.script.display(),
            frame_dir.display()
        );

        let mut command = Command::new(&self.interpreter);
        command
            .arg(&self.script)
            .arg(frame_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(base) = self.script.parent() {
            command.current_dir(base);
        }

        let mut child = command.spawn()?;

        let stdout = child.stdout.take().expect("stdout not captured");
        let stderr = child.stderr.take().expect("stderr not captured");
        let stdout_task =
            stream_lines(stdout, self.status.clone(), frame_dir.to_path_buf(), video_length);
        let stderr_task =
            stream_lines(stderr, self.status.clone(), frame_dir.to_path_buf(), video_length);

        let status = child.wait().await?;
        let stdout_text = stdout_task.await.unwrap_or_default();
        let stderr_text = stderr_task.await.unwrap_or_default();

        let code = status.code().ok_or_else(|| MediaError::DetectorProcessFailed {
            message: "detector terminated by signal".to_string(),
        })?;

        Ok((code, stdout_text, stderr_text))
    }
}

#[async_trait]
impl Detector for WildlifeDetector {
    async fn run(&self, video: &Path) -> MediaResult<DetectionReport> {
        let frame_dir = video.with_extension("");
        let crops_dir = PathBuf::from(format!("{}{}", frame_dir.display(), CROPS_DIR_SUFFIX));

        tokio::fs::create_dir_all(&frame_dir).await?;
        tokio::fs::create_dir_all(&crops_dir).await?;

        info!("Extracting frames for {}", video.display());
        let video_length = extract_frames(video, &frame_dir, self.fps).await?;

        info!(
            "Starting analysis for images in {} ({}s of video)",
            frame_dir.display(),
            video_length
        );
        let (code, stdout, stderr) = self.run_detector_process(&frame_dir, video_length).await?;

        debug!("Detector exit code {}", code);
        match code {
            0 => {}
            1 => {
                return Err(MediaError::DetectionFailed {
                    frame_dir,
                    exit_code: code,
                    stdout,
                    stderr,
                })
            }
            other => {
                return Err(MediaError::DetectorProcessFailed {
                    message: format!("unexpected exit code {}", other),
                })
            }
        }

        let raw = tokio::fs::read(frame_dir.join(DETECTION_OUTPUT_FILE)).await?;
        let mut output: DetectionOutput = serde_json::from_slice(&raw)?;

        let crops = produce_crops(&mut output, &crops_dir, self.crop_border)?;

        tokio::fs::remove_dir_all(&frame_dir).await?;

        Ok(DetectionReport {
            video_length,
            avg_time: output.avg_time,
            frames: output.frames,
            output: stdout,
            errors: stderr,
            crops,
        })
    }
}

/// Annotate each frame from its filename encoding and write one crop image
/// per detection into `crops_dir`, named `{timestamp}-{index}.jpg`.
///
/// Crops are produced sequentially, one detection at a time.
pub fn produce_crops(
    output: &mut DetectionOutput,
    crops_dir: &Path,
    border: u32,
) -> MediaResult<BTreeMap<String, PathBuf>> {
    let mut crops = BTreeMap::new();

    for frame in &mut output.frames {
        let info = parse_frame_path(&frame.file)?;
        frame.width = info.width;
        frame.height = info.height;
        frame.timestamp = info.timestamp;

        if frame.detections.is_empty() {
            continue;
        }

        debug!("Cropping {} detections into {}", frame.detections.len(), crops_dir.display());
        let image = image::open(&frame.file)?;

        for (index, detection) in frame.detections.iter().enumerate() {
            let rect =
                compute_crop_rect(info.width, info.height, detection.bounding_box, border);
            let name = format!("{}-{}.jpg", format_timestamp(frame.timestamp), index);
            let destination = crops_dir.join(&name);

            image
                .crop_imm(rect.left, rect.top, rect.width, rect.height)
                .save(&destination)?;

            crops.insert(name, destination);
        }
    }

    Ok(crops)
}

/// Mirror every non-empty line to the status sink while accumulating the
/// full text for the report.
fn stream_lines<R>(
    reader: R,
    sink: StatusSink,
    frame_dir: PathBuf,
    video_length: f64,
) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut text = String::new();

        while let Ok(Some(line)) = lines.next_line().await {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                debug!("{}", trimmed);
                sink.update(&StatusUpdate {
                    message: trimmed.to_string(),
                    frame_dir: frame_dir.clone(),
                    video_length,
                });
            }
            text.push_str(&line);
            text.push('\n');
        }

        text
    })
}
