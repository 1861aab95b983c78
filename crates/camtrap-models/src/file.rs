//! Ingested camera files and filename parsing.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File classification derived from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    Video,
    Image,
    Other,
}

impl FileType {
    /// Classify a path by its extension. Unknown extensions are `Other`.
    pub fn from_path(path: &str) -> Self {
        match path.rsplit('.').next() {
            Some("mp4") => FileType::Video,
            Some("jpg") => FileType::Image,
            _ => FileType::Other,
        }
    }
}

/// A file selected from the ingestion store.
///
/// Immutable once constructed; its identity is `path` at selection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Path within the ingestion store
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Classification by extension
    pub file_type: FileType,
    /// Camera identifier parsed from the filename
    pub source: String,
    /// Capture timestamp parsed from the filename
    pub captured: NaiveDateTime,
}

impl RemoteFile {
    /// Results-store prefix for this file: `{source}/{captured ISO-8601}`.
    pub fn results_prefix(&self) -> String {
        format!("{}/{}", self.source, self.captured_iso8601())
    }

    /// Capture time in the ISO-8601 form used for result keys and staging
    /// filenames, e.g. `2023-06-15T14:30:00.000Z`.
    pub fn captured_iso8601(&self) -> String {
        self.captured
            .and_utc()
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}

/// Errors raised when an ingested filename does not follow the camera
/// naming convention.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilenameError {
    #[error("file path {0} can not be parsed")]
    Unparsable(String),

    #[error("capture time {time} in {path} can not be parsed")]
    BadTimestamp { path: String, time: String },
}

fn ingest_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<source>.+)_(?P<captured>[0-9]+)\.[^.]*$").expect("valid regex"))
}

/// Parse a `{source}_{YYYYMMDDHHMMSS}.{ext}` ingest filename.
///
/// The source keeps camera names containing underscores intact and strips a
/// trailing `_0`/`_00` firmware suffix. Only the final path segment is
/// considered.
pub fn parse_ingest_filename(path: &str) -> Result<(String, NaiveDateTime), FilenameError> {
    let filename = path.rsplit('/').next().unwrap_or(path);

    let captures = ingest_name_regex()
        .captures(filename)
        .ok_or_else(|| FilenameError::Unparsable(path.to_string()))?;

    let digits = &captures["captured"];
    if digits.len() < 14 {
        return Err(FilenameError::BadTimestamp {
            path: path.to_string(),
            time: digits.to_string(),
        });
    }

    let captured = NaiveDateTime::parse_from_str(&digits[..14], "%Y%m%d%H%M%S").map_err(|_| {
        FilenameError::BadTimestamp {
            path: path.to_string(),
            time: digits.to_string(),
        }
    })?;

    Ok((strip_source_suffix(&captures["source"]), captured))
}

fn strip_source_suffix(source: &str) -> String {
    source
        .strip_suffix("_00")
        .or_else(|| source.strip_suffix("_0"))
        .or_else(|| source.strip_suffix('_'))
        .unwrap_or(source)
        .to_string()
}
