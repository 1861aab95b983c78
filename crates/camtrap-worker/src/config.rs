//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the analysis worker, read from the environment.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root directory of the ingestion store
    pub ingest_root: PathBuf,
    /// Directory for staged working copies
    pub staging_dir: PathBuf,
    /// Path of the overwrite-per-line progress file
    pub status_file: PathBuf,
    /// Path of the append-only metadata journal
    pub metadata_file: PathBuf,
    /// Interpreter used to run the detector script
    pub detector_interpreter: PathBuf,
    /// Path of the detector script
    pub detector_script: PathBuf,
    /// Frame sampling rate in frames per second
    pub frame_fps: f64,
    /// Border in pixels added around detection crops
    pub crop_border: u32,
    /// Pause between scheduler cycles
    pub poll_interval: Duration,
    /// Pause between selection skip-and-retry rounds
    pub select_retry_pause: Duration,
    /// Camera sources excluded from analysis
    pub deny_sources: Vec<String>,
    /// Bucket holding the backfill backlog
    pub archive_bucket: String,
    /// Bucket receiving analyzed videos and crops
    pub results_bucket: String,
}

impl WorkerConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self {
            ingest_root: env_path("CAMTRAP_INGEST_ROOT", "/srv/camtrap/ingest"),
            staging_dir: env_path("CAMTRAP_STAGING_DIR", "/tmp/camtrap"),
            status_file: env_path("CAMTRAP_STATUS_FILE", "/tmp/camtrap/status.json"),
            metadata_file: env_path("CAMTRAP_METADATA_FILE", "/var/lib/camtrap/metadata.jsonl"),
            detector_interpreter: env_path("CAMTRAP_DETECTOR_INTERPRETER", "/usr/bin/python3"),
            detector_script: env_path("CAMTRAP_DETECTOR_SCRIPT", "/opt/camtrap/detector/run.py"),
            frame_fps: env_parse("CAMTRAP_FRAME_FPS", 1.0),
            crop_border: env_parse("CAMTRAP_CROP_BORDER", 100),
            poll_interval: Duration::from_secs(env_parse("CAMTRAP_POLL_INTERVAL_SECS", 20)),
            select_retry_pause: Duration::from_secs(env_parse(
                "CAMTRAP_SELECT_RETRY_PAUSE_SECS",
                1,
            )),
            deny_sources: std::env::var("CAMTRAP_DENY_SOURCES")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            archive_bucket: env_string("CAMTRAP_ARCHIVE_BUCKET", "camtrap-archive"),
            results_bucket: env_string("CAMTRAP_RESULTS_BUCKET", "camtrap-results"),
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_path(key: &str, default: &str) -> PathBuf {
    PathBuf::from(env_string(key, default))
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_environment() {
        let config = WorkerConfig::from_env();
        assert_eq!(config.frame_fps, 1.0);
        assert_eq!(config.crop_border, 100);
        assert_eq!(config.poll_interval, Duration::from_secs(20));
        assert_eq!(config.select_retry_pause, Duration::from_secs(1));
        assert!(config.deny_sources.is_empty());
    }
}
