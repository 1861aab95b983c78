//! Frame filename encoding shared by the extractor and the detector.
//!
//! Extracted frames are renamed to `{width}x{height}-{timestamp}.jpg` so the
//! detection stage can recover resolution and the offset into the video
//! without re-probing the image.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Resolution and timestamp recovered from a frame filename.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    /// Offset into the video in seconds
    pub timestamp: f64,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no frame info encoded in {0}")]
pub struct FrameNameError(pub String);

fn frame_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?P<width>[0-9]+)x(?P<height>[0-9]+)-(?P<timestamp>[0-9.]+)\.jpg$")
            .expect("valid regex")
    })
}

/// Parse `{width}x{height}-{timestamp}.jpg` from the end of a frame path.
pub fn parse_frame_path(path: &str) -> Result<FrameInfo, FrameNameError> {
    let captures = frame_name_regex()
        .captures(path)
        .ok_or_else(|| FrameNameError(path.to_string()))?;

    let parse = |name: &str| captures[name].parse().map_err(|_| FrameNameError(path.to_string()));

    Ok(FrameInfo {
        width: parse("width")?,
        height: parse("height")?,
        timestamp: captures["timestamp"]
            .parse()
            .map_err(|_| FrameNameError(path.to_string()))?,
    })
}

/// Format a timestamp offset for filenames: whole seconds render without a
/// fractional part (`3`, not `3.0`), fractional offsets keep their fraction.
pub fn format_timestamp(seconds: f64) -> String {
    if seconds.fract() == 0.0 {
        format!("{}", seconds as u64)
    } else {
        format!("{}", seconds)
    }
}

/// Build a frame filename. The timestamp is zero-padded to five characters to
/// keep directory listings in playback order.
pub fn format_frame_name(width: u32, height: u32, timestamp: f64) -> String {
    format!("{}x{}-{:0>5}.jpg", width, height, format_timestamp(timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_whole_second_frames() {
        let name = format_frame_name(1920, 1080, 3.0);
        assert_eq!(name, "1920x1080-00003.jpg");

        let info = parse_frame_path(&format!("/tmp/frames/{}", name)).unwrap();
        assert_eq!(
            info,
            FrameInfo {
                width: 1920,
                height: 1080,
                timestamp: 3.0,
            }
        );
    }

    #[test]
    fn keeps_fractional_offsets() {
        let name = format_frame_name(640, 480, 2.5);
        assert_eq!(name, "640x480-002.5.jpg");
        assert_eq!(parse_frame_path(&name).unwrap().timestamp, 2.5);
    }

    #[test]
    fn rejects_unencoded_names() {
        assert!(parse_frame_path("/tmp/frames/00001.jpg").is_err());
        assert!(parse_frame_path("whatever.png").is_err());
    }

    #[test]
    fn format_timestamp_drops_trailing_zero() {
        assert_eq!(format_timestamp(7.0), "7");
        assert_eq!(format_timestamp(0.5), "0.5");
    }
}
