//! Detection output contract with the external detector process.
//!
//! The detector writes `output.json` into the frames directory on success.
//! These types mirror that wire format; `width`, `height` and `timestamp` on a
//! frame are filled in afterwards from the frame filename encoding.

use serde::{Deserialize, Serialize};

/// Detection category reported by the external detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DetectionCategory {
    Animal,
    Person,
    Vehicle,
}

impl TryFrom<u8> for DetectionCategory {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DetectionCategory::Animal),
            2 => Ok(DetectionCategory::Person),
            3 => Ok(DetectionCategory::Vehicle),
            other => Err(format!("unknown detection category {}", other)),
        }
    }
}

impl From<DetectionCategory> for u8 {
    fn from(category: DetectionCategory) -> u8 {
        match category {
            DetectionCategory::Animal => 1,
            DetectionCategory::Person => 2,
            DetectionCategory::Vehicle => 3,
        }
    }
}

/// One bounding-box classification within a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// `[x, y, w, h]` normalized to the frame dimensions
    #[serde(rename = "boundingBox")]
    pub bounding_box: [f64; 4],
    pub category: DetectionCategory,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
}

/// All detections for one extracted frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    /// Path of the frame image the detector was given
    pub file: String,
    pub detections: Vec<Detection>,
    #[serde(rename = "maxDetectionConfidence", default)]
    pub max_detection_confidence: f64,
    /// Per-frame failure note from the detector, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    /// Offset into the video in seconds (from the filename encoding)
    #[serde(default)]
    pub timestamp: f64,
    /// Frame width in pixels (from the filename encoding)
    #[serde(default)]
    pub width: u32,
    /// Frame height in pixels (from the filename encoding)
    #[serde(default)]
    pub height: u32,
}

/// The parsed `output.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionOutput {
    /// Average detector time per frame in seconds
    #[serde(rename = "avgTime")]
    pub avg_time: f64,
    pub frames: Vec<DetectionFrame>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detector_output_json() {
        let raw = r#"{
            "avgTime": 0.42,
            "frames": [
                {
                    "file": "/tmp/frames/1920x1080-00003.jpg",
                    "maxDetectionConfidence": 0.91,
                    "detections": [
                        {"boundingBox": [0.1, 0.2, 0.3, 0.4], "category": 1, "confidence": 0.91},
                        {"boundingBox": [0.5, 0.5, 0.1, 0.1], "category": 2, "confidence": 0.55}
                    ]
                }
            ]
        }"#;

        let output: DetectionOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(output.avg_time, 0.42);
        assert_eq!(output.frames.len(), 1);

        let frame = &output.frames[0];
        assert_eq!(frame.detections[0].category, DetectionCategory::Animal);
        assert_eq!(frame.detections[1].category, DetectionCategory::Person);
        assert_eq!(frame.max_detection_confidence, 0.91);
        // Annotations are filled in later from the filename encoding
        assert_eq!(frame.width, 0);
        assert_eq!(frame.timestamp, 0.0);
    }

    #[test]
    fn rejects_unknown_category() {
        let raw = r#"{"boundingBox": [0, 0, 1, 1], "category": 9, "confidence": 0.5}"#;
        assert!(serde_json::from_str::<Detection>(raw).is_err());
    }

    #[test]
    fn category_round_trips_as_number() {
        let json = serde_json::to_string(&DetectionCategory::Vehicle).unwrap();
        assert_eq!(json, "3");
        let back: DetectionCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DetectionCategory::Vehicle);
    }
}
