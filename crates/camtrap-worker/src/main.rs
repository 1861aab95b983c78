//! Camera analysis worker binary.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use camtrap_media::{StatusSink, WildlifeDetector};
use camtrap_storage::{
    FsIngestStore, IngestStore, LocalStaging, ObjectStore, RemoteFileSelector, S3Config,
    S3ObjectStore, StorageMigrator,
};
use camtrap_worker::{
    AnalysisOrchestrator, JsonlMetadataStore, PollingScheduler, WorkerConfig,
};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("camtrap=info".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting camtrap-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let s3_config = match S3Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load object store config: {}", e);
            std::process::exit(1);
        }
    };
    let archive: Arc<dyn ObjectStore> =
        Arc::new(S3ObjectStore::connect(&s3_config, &config.archive_bucket));
    let results: Arc<dyn ObjectStore> =
        Arc::new(S3ObjectStore::connect(&s3_config, &config.results_bucket));

    if let Err(e) = results.check_liveness().await {
        error!("Results bucket not reachable: {}", e);
        std::process::exit(1);
    }

    let ingest: Arc<dyn IngestStore> = Arc::new(FsIngestStore::new(&config.ingest_root));

    let detector = WildlifeDetector::new(
        &config.detector_interpreter,
        &config.detector_script,
        StatusSink::new(&config.status_file),
    )
    .with_fps(config.frame_fps)
    .with_crop_border(config.crop_border);

    let selector = RemoteFileSelector::new(ingest.clone())
        .with_deny_sources(config.deny_sources.clone())
        .with_retry_pause(config.select_retry_pause);

    let orchestrator = AnalysisOrchestrator::new(
        selector,
        LocalStaging::new(&config.staging_dir),
        Arc::new(detector),
        Arc::new(JsonlMetadataStore::new(&config.metadata_file)),
        ingest.clone(),
        results,
    );
    let migrator = StorageMigrator::new(ingest, archive);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx.send(true).ok();
    });

    let mut scheduler = PollingScheduler::new(
        orchestrator,
        migrator,
        config.poll_interval,
        shutdown_rx,
    );
    scheduler.run().await;

    info!("Worker shutdown complete");
}
