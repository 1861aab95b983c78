//! The unattended polling loop.

use std::time::{Duration, Instant};

use metrics::counter;
use tokio::sync::watch;
use tracing::{error, info, trace};

use camtrap_storage::StorageMigrator;

use crate::orchestrator::AnalysisOrchestrator;

/// Drives orchestration cycles until shut down.
///
/// Every cycle failure triggers a best-effort backfill from the archive
/// bucket, so an empty or broken live feed still keeps the pipeline busy.
pub struct PollingScheduler {
    orchestrator: AnalysisOrchestrator,
    migrator: StorageMigrator,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl PollingScheduler {
    pub fn new(
        orchestrator: AnalysisOrchestrator,
        migrator: StorageMigrator,
        poll_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            orchestrator,
            migrator,
            poll_interval,
            shutdown,
        }
    }

    /// Poll until the shutdown channel flips. Individual cycle failures are
    /// logged and never end the loop.
    pub async fn run(&mut self) {
        let started = Instant::now();
        let mut cycle: u64 = 0;

        loop {
            cycle += 1;
            info!(
                "Cycle {} (up {}s)",
                cycle,
                started.elapsed().as_secs()
            );

            match self.orchestrator.run_cycle().await {
                Ok(()) => {
                    counter!("camtrap_cycles_completed").increment(1);
                }
                Err(error) => {
                    if error.is_already_skipped() {
                        info!("Nothing selectable: {}", error);
                    } else {
                        error!("Cycle {} failed: {}", cycle, error);
                        counter!("camtrap_cycles_failed").increment(1);
                    }

                    match self.migrator.backfill().await {
                        Ok(()) => {
                            counter!("camtrap_backfills").increment(1);
                        }
                        Err(backfill_error) => {
                            trace!("Backfill not possible: {}", backfill_error);
                        }
                    }
                }
            }

            if self.wait_for_next_cycle().await {
                info!("Shutdown requested, stopping after cycle {}", cycle);
                return;
            }
        }
    }

    /// Sleep for the poll interval. Returns true when shutdown was requested
    /// during the pause.
    async fn wait_for_next_cycle(&mut self) -> bool {
        if *self.shutdown.borrow() {
            return true;
        }

        tokio::select! {
            _ = tokio::time::sleep(self.poll_interval) => false,
            changed = self.shutdown.changed() => {
                changed.is_err() || *self.shutdown.borrow()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use camtrap_media::{Detector, MediaResult};
    use camtrap_models::report::DetectionReport;
    use camtrap_storage::{
        FsIngestStore, IngestStore, LocalStaging, MemoryObjectStore, RemoteFileSelector,
    };

    use crate::metadata::MemoryMetadataStore;

    struct NeverCalledDetector;

    #[async_trait]
    impl Detector for NeverCalledDetector {
        async fn run(&self, _video: &Path) -> MediaResult<DetectionReport> {
            panic!("detector must not run without a selectable file");
        }
    }

    #[tokio::test]
    async fn empty_feed_triggers_backfill_and_shutdown_stops_the_loop() {
        let ingest_dir = TempDir::new().unwrap();
        let staging_dir = TempDir::new().unwrap();

        let ingest = Arc::new(FsIngestStore::new(ingest_dir.path()));
        let archive = Arc::new(
            MemoryObjectStore::new()
                .with_object("Meadow_20230615143000.mp4", b"video".to_vec()),
        );

        let selector = RemoteFileSelector::new(ingest.clone() as Arc<dyn IngestStore>)
            .with_retry_pause(Duration::ZERO);
        let orchestrator = AnalysisOrchestrator::new(
            selector,
            LocalStaging::new(staging_dir.path()),
            Arc::new(NeverCalledDetector),
            Arc::new(MemoryMetadataStore::new()),
            ingest.clone(),
            Arc::new(MemoryObjectStore::new()),
        );
        let migrator = StorageMigrator::new(ingest.clone(), archive.clone());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // Long interval so the loop parks after its first cycle
        let mut scheduler = PollingScheduler::new(
            orchestrator,
            migrator,
            Duration::from_secs(3600),
            shutdown_rx,
        );

        let handle = tokio::spawn(async move { scheduler.run().await });

        // The first cycle finds no file and backfills the archived video
        // into the ingest store.
        for _ in 0..200 {
            if archive.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(ingest.get("Meadow_20230615143000.mp4").await.is_ok());
        assert!(archive.is_empty());

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler stops on shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn shutdown_before_first_pause_is_honored() {
        let ingest_dir = TempDir::new().unwrap();
        let staging_dir = TempDir::new().unwrap();
        let ingest = Arc::new(FsIngestStore::new(ingest_dir.path()));

        let selector = RemoteFileSelector::new(ingest.clone() as Arc<dyn IngestStore>)
            .with_retry_pause(Duration::ZERO);
        let orchestrator = AnalysisOrchestrator::new(
            selector,
            LocalStaging::new(staging_dir.path()),
            Arc::new(NeverCalledDetector),
            Arc::new(MemoryMetadataStore::new()),
            ingest.clone(),
            Arc::new(MemoryObjectStore::new()),
        );
        let migrator = StorageMigrator::new(ingest, Arc::new(MemoryObjectStore::new()));

        let (shutdown_tx, shutdown_rx) = watch::channel(true);
        drop(shutdown_tx);

        let mut scheduler = PollingScheduler::new(
            orchestrator,
            migrator,
            Duration::from_secs(3600),
            shutdown_rx,
        );

        tokio::time::timeout(Duration::from_secs(1), scheduler.run())
            .await
            .expect("already-signalled shutdown stops after one cycle");
    }
}
