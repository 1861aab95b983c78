//! End-to-end processing of one selected video.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use camtrap_media::{Detector, CROPS_DIR_SUFFIX};
use camtrap_models::detection::{Detection, DetectionCategory};
use camtrap_models::file::RemoteFile;
use camtrap_models::records::{FileRecord, FrameRecord, ReportRecord};
use camtrap_models::report::DetectionReport;
use camtrap_storage::{move_to_skipped, IngestStore, LocalStaging, ObjectStore, RemoteFileSelector};

use crate::error::WorkerResult;
use crate::metadata::MetadataStore;

/// Longest detector output text stored with a report, in characters.
const PERSISTENCE_TEXT_LIMIT: usize = 62_000;

/// Runs one video through selection, staging, detection, persistence and
/// archival.
///
/// A cycle stages at most one working copy and removes it on every exit
/// path. Skip-recoverable detection failures route the source file into the
/// skipped partition and re-raise; everything else propagates untouched.
pub struct AnalysisOrchestrator {
    selector: RemoteFileSelector,
    staging: LocalStaging,
    detector: Arc<dyn Detector>,
    metadata: Arc<dyn MetadataStore>,
    ingest: Arc<dyn IngestStore>,
    results: Arc<dyn ObjectStore>,
}

impl AnalysisOrchestrator {
    pub fn new(
        selector: RemoteFileSelector,
        staging: LocalStaging,
        detector: Arc<dyn Detector>,
        metadata: Arc<dyn MetadataStore>,
        ingest: Arc<dyn IngestStore>,
        results: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            selector,
            staging,
            detector,
            metadata,
            ingest,
            results,
        }
    }

    /// Process the next analyzable file end to end.
    pub async fn run_cycle(&self) -> WorkerResult<()> {
        let started = Instant::now();

        let ingested = self.selector.select_validated().await?;
        let file = ingested.metadata;

        let staged_name = format!("{}.mp4", file.captured_iso8601());
        let staged = self.staging.stage(&staged_name, &ingested.body).await?;

        let outcome = self.process_staged(&file, staged.path(), started).await;
        staged.remove().await;
        outcome
    }

    async fn process_staged(
        &self,
        file: &RemoteFile,
        video: &Path,
        started: Instant,
    ) -> WorkerResult<()> {
        let report = match self.detector.run(video).await {
            Ok(report) => report,
            Err(error) if error.is_skip_recoverable() => {
                warn!("Analysis of {} not possible: {}", file.path, error);
                move_to_skipped(self.ingest.as_ref(), &file.path).await?;
                cleanup_partial_artifacts(video).await;
                return Err(error.into());
            }
            Err(error) => return Err(error.into()),
        };

        self.persist_metadata(file, &report, started.elapsed()).await?;

        if report.frames.is_empty() {
            info!("No frames analyzed for {}, nothing to archive", file.path);
        } else {
            self.archive_results(file, video, &report).await?;
        }
        remove_crops_dir(video).await;

        self.ingest.delete(&file.path).await?;
        info!(
            "Finished {} in {:.1}s",
            file.path,
            started.elapsed().as_secs_f64()
        );
        Ok(())
    }

    async fn persist_metadata(
        &self,
        file: &RemoteFile,
        report: &DetectionReport,
        elapsed: Duration,
    ) -> WorkerResult<()> {
        let file_id = self
            .metadata
            .store_file(FileRecord::from_remote(file, report.video_length))
            .await?;

        let report_id = self
            .metadata
            .store_report(ReportRecord {
                file_id,
                avg_time_per_frame_ms: report.avg_time * 1000.0,
                duration_ms: elapsed.as_secs_f64() * 1000.0,
                output: truncate_for_persistence(&report.output),
                errors: truncate_for_persistence(&report.errors),
            })
            .await?;

        let frames = report
            .frames
            .iter()
            .map(|frame| FrameRecord {
                report_id,
                file: frame.file.clone(),
                timestamp: frame.timestamp,
                width: frame.width,
                height: frame.height,
                detections: frame.detections.clone(),
                max_detection_confidence: frame.max_detection_confidence,
                detected_categories: distinct_categories(&frame.detections),
            })
            .collect();
        self.metadata.store_frames(frames).await?;

        debug!("Stored metadata for {} (file id {})", file.path, file_id);
        Ok(())
    }

    /// Upload the video and every crop under `{source}/{captured ISO-8601}/`,
    /// deleting each local crop after its upload.
    async fn archive_results(
        &self,
        file: &RemoteFile,
        video: &Path,
        report: &DetectionReport,
    ) -> WorkerResult<()> {
        let prefix = file.results_prefix();

        let bytes = tokio::fs::read(video).await?;
        self.results
            .put(&format!("{}/video.mp4", prefix), bytes, "video/mp4")
            .await?;

        for (name, path) in &report.crops {
            let bytes = tokio::fs::read(path).await?;
            self.results
                .put(&format!("{}/{}", prefix, name), bytes, "image/jpeg")
                .await?;

            if let Err(error) = tokio::fs::remove_file(path).await {
                warn!("Failed to remove crop {}: {}", path.display(), error);
            }
        }

        info!(
            "Archived video and {} crops under {}",
            report.crops.len(),
            prefix
        );
        Ok(())
    }
}

fn truncate_for_persistence(text: &str) -> String {
    if text.chars().count() <= PERSISTENCE_TEXT_LIMIT {
        return text.to_string();
    }
    text.chars().take(PERSISTENCE_TEXT_LIMIT).collect()
}

fn distinct_categories(detections: &[Detection]) -> Vec<DetectionCategory> {
    detections
        .iter()
        .map(|detection| detection.category)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Remove the frame and crop directories a failed detection run left behind.
async fn cleanup_partial_artifacts(video: &Path) {
    let frame_dir = video.with_extension("");
    for dir in [frame_dir.clone(), crops_dir_for(video)] {
        if let Err(error) = tokio::fs::remove_dir_all(&dir).await {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", dir.display(), error);
            }
        }
    }
}

async fn remove_crops_dir(video: &Path) {
    let dir = crops_dir_for(video);
    if let Err(error) = tokio::fs::remove_dir_all(&dir).await {
        if error.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", dir.display(), error);
        }
    }
}

fn crops_dir_for(video: &Path) -> std::path::PathBuf {
    std::path::PathBuf::from(format!(
        "{}{}",
        video.with_extension("").display(),
        CROPS_DIR_SUFFIX
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use camtrap_media::{MediaError, MediaResult};
    use camtrap_models::detection::DetectionFrame;
    use camtrap_storage::{FsIngestStore, MemoryObjectStore, StorageError};
    use camtrap_models::file::FileType;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    use crate::error::WorkerError;
    use crate::metadata::MemoryMetadataStore;

    /// Detector stub driven by a canned outcome.
    struct StubDetector {
        outcome: StubOutcome,
    }

    enum StubOutcome {
        Frames(usize),
        NoFrames,
        ExtractionFailure,
        DetectionFailure,
    }

    #[async_trait]
    impl Detector for StubDetector {
        async fn run(&self, video: &Path) -> MediaResult<DetectionReport> {
            match &self.outcome {
                StubOutcome::Frames(count) => {
                    let crops_dir = crops_dir_for(video);
                    tokio::fs::create_dir_all(&crops_dir).await?;
                    let mut crops = BTreeMap::new();
                    for index in 0..*count {
                        let name = format!("{}-0.jpg", index);
                        let path = crops_dir.join(&name);
                        tokio::fs::write(&path, b"jpeg").await?;
                        crops.insert(name, path);
                    }

                    let frames = (0..*count)
                        .map(|index| DetectionFrame {
                            file: format!("640x480-0000{}.jpg", index),
                            detections: vec![Detection {
                                bounding_box: [0.1, 0.1, 0.2, 0.2],
                                category: DetectionCategory::Animal,
                                confidence: 0.9,
                            }],
                            max_detection_confidence: 0.9,
                            failure: None,
                            timestamp: index as f64,
                            width: 640,
                            height: 480,
                        })
                        .collect();

                    Ok(DetectionReport {
                        video_length: 10.0,
                        avg_time: 0.5,
                        frames,
                        output: "done".to_string(),
                        errors: String::new(),
                        crops,
                    })
                }
                StubOutcome::NoFrames => Ok(DetectionReport {
                    video_length: 10.0,
                    avg_time: 0.0,
                    frames: Vec::new(),
                    output: String::new(),
                    errors: String::new(),
                    crops: BTreeMap::new(),
                }),
                StubOutcome::ExtractionFailure => {
                    Err(MediaError::NotEnoughFramesForAnalysis(video.to_path_buf()))
                }
                StubOutcome::DetectionFailure => Err(MediaError::DetectionFailed {
                    frame_dir: video.with_extension(""),
                    exit_code: 1,
                    stdout: "boom".to_string(),
                    stderr: String::new(),
                }),
            }
        }
    }

    struct Harness {
        _ingest_dir: TempDir,
        _staging_dir: TempDir,
        ingest: Arc<FsIngestStore>,
        metadata: Arc<MemoryMetadataStore>,
        results: Arc<MemoryObjectStore>,
        staging_root: std::path::PathBuf,
        orchestrator: AnalysisOrchestrator,
    }

    async fn harness(outcome: StubOutcome) -> Harness {
        let ingest_dir = TempDir::new().unwrap();
        let staging_dir = TempDir::new().unwrap();
        let staging_root = staging_dir.path().join("work");

        let ingest = Arc::new(FsIngestStore::new(ingest_dir.path()));
        let metadata = Arc::new(MemoryMetadataStore::new());
        let results = Arc::new(MemoryObjectStore::new());

        let selector = RemoteFileSelector::new(ingest.clone() as Arc<dyn IngestStore>)
            .with_retry_pause(Duration::ZERO);
        let orchestrator = AnalysisOrchestrator::new(
            selector,
            LocalStaging::new(&staging_root),
            Arc::new(StubDetector { outcome }),
            metadata.clone(),
            ingest.clone(),
            results.clone(),
        );

        Harness {
            _ingest_dir: ingest_dir,
            _staging_dir: staging_dir,
            ingest,
            metadata,
            results,
            staging_root,
            orchestrator,
        }
    }

    fn staged_files(root: &Path) -> Vec<String> {
        match std::fs::read_dir(root) {
            Ok(entries) => entries
                .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn successful_cycle_persists_archives_and_cleans_up() {
        let harness = harness(StubOutcome::Frames(2)).await;
        harness
            .ingest
            .put("Meadow_20230615143000.mp4", b"video-bytes")
            .await
            .unwrap();

        harness.orchestrator.run_cycle().await.unwrap();

        // Metadata: one file, one report, two frames with category sets
        let files = harness.metadata.files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].source, "Meadow");
        assert_eq!(files[0].length_secs, Some(10.0));
        assert_eq!(files[0].file_type, FileType::Video);

        let reports = harness.metadata.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].file_id, 1);
        assert_eq!(reports[0].avg_time_per_frame_ms, 500.0);

        let frames = harness.metadata.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].detected_categories, vec![DetectionCategory::Animal]);

        // Results bucket holds the video and both crops under the prefix
        let prefix = "Meadow/2023-06-15T14:30:00.000Z";
        assert!(harness.results.contains(&format!("{}/video.mp4", prefix)));
        assert!(harness.results.contains(&format!("{}/0-0.jpg", prefix)));
        assert!(harness.results.contains(&format!("{}/1-0.jpg", prefix)));

        // Source gone, staging empty
        assert!(harness.ingest.get("Meadow_20230615143000.mp4").await.is_err());
        assert!(staged_files(&harness.staging_root).is_empty());
    }

    #[tokio::test]
    async fn zero_frames_skips_archival_but_still_deletes_source() {
        let harness = harness(StubOutcome::NoFrames).await;
        harness
            .ingest
            .put("Meadow_20230615143000.mp4", b"video-bytes")
            .await
            .unwrap();

        harness.orchestrator.run_cycle().await.unwrap();

        assert!(harness.results.is_empty());
        assert_eq!(harness.metadata.files().len(), 1);
        assert!(harness.metadata.frames().is_empty());
        assert!(harness.ingest.get("Meadow_20230615143000.mp4").await.is_err());
        assert!(staged_files(&harness.staging_root).is_empty());
    }

    #[tokio::test]
    async fn extraction_failure_routes_source_to_skipped() {
        let harness = harness(StubOutcome::ExtractionFailure).await;
        harness
            .ingest
            .put("Meadow_20230615143000.mp4", b"video-bytes")
            .await
            .unwrap();

        let error = harness.orchestrator.run_cycle().await.unwrap_err();
        assert!(matches!(
            error,
            WorkerError::Media(MediaError::NotEnoughFramesForAnalysis(_))
        ));

        assert!(harness
            .ingest
            .get("z_skipped/Meadow_20230615143000.mp4")
            .await
            .is_ok());
        assert!(harness.metadata.files().is_empty());
        assert!(staged_files(&harness.staging_root).is_empty());
    }

    #[tokio::test]
    async fn detection_failure_propagates_without_skip_routing() {
        let harness = harness(StubOutcome::DetectionFailure).await;
        harness
            .ingest
            .put("Meadow_20230615143000.mp4", b"video-bytes")
            .await
            .unwrap();

        let error = harness.orchestrator.run_cycle().await.unwrap_err();
        assert!(matches!(
            error,
            WorkerError::Media(MediaError::DetectionFailed { .. })
        ));

        // Source stays put for the next attempt, staged copy is still removed
        assert!(harness.ingest.get("Meadow_20230615143000.mp4").await.is_ok());
        assert!(staged_files(&harness.staging_root).is_empty());
    }

    #[tokio::test]
    async fn empty_store_propagates_selection_failure() {
        let harness = harness(StubOutcome::NoFrames).await;
        let error = harness.orchestrator.run_cycle().await.unwrap_err();
        assert!(matches!(
            error,
            WorkerError::Storage(StorageError::NoFileFound(_))
        ));
    }

    #[test]
    fn truncation_respects_character_boundaries() {
        let text = "ä".repeat(PERSISTENCE_TEXT_LIMIT + 5);
        let truncated = truncate_for_persistence(&text);
        assert_eq!(truncated.chars().count(), PERSISTENCE_TEXT_LIMIT);

        assert_eq!(truncate_for_persistence("short"), "short");
    }

    #[test]
    fn categories_are_deduplicated_and_ordered() {
        let detections: Vec<Detection> = [
            DetectionCategory::Vehicle,
            DetectionCategory::Animal,
            DetectionCategory::Vehicle,
        ]
        .iter()
        .map(|category| Detection {
            bounding_box: [0.0, 0.0, 0.1, 0.1],
            category: *category,
            confidence: 0.5,
        })
        .collect();

        assert_eq!(
            distinct_categories(&detections),
            vec![DetectionCategory::Animal, DetectionCategory::Vehicle]
        );
    }
}
