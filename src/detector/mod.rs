//! Emotion detector input
//!
//! The face detector and emotion classifier run outside this crate. They
//! report one JSON object per camera frame:
//!
//! ```json
//! {"faces": [{"box": [x, y, w, h], "emotions": {"happy": 0.81, "sad": 0.04}}],
//!  "timestamp_ms": 1500}
//! ```
//!
//! A face may carry `"label"` and `"confidence"` instead of the full
//! `"emotions"` distribution. `timestamp_ms` is optional.

mod source;

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::Result;

pub use source::{FrameSource, JsonLinesSource, SidecarSource, ThreadedLinesSource};

/// Face bounding box in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "[i64; 4]")]
pub struct BoundingBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl From<[i64; 4]> for BoundingBox {
    fn from([x, y, width, height]: [i64; 4]) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl BoundingBox {
    /// Box area; degenerate boxes count as zero
    #[must_use]
    pub fn area(&self) -> i64 {
        self.width.max(0).saturating_mul(self.height.max(0))
    }
}

/// One detected face reduced to its dominant emotion
#[derive(Debug, Clone, PartialEq)]
pub struct FaceDetection {
    pub bbox: BoundingBox,
    /// Raw detector label, e.g. "happy"
    pub label: String,
    /// Detector confidence for `label`, clamped to `[0, 1]` when parsed
    pub confidence: f32,
}

/// Everything the detector reported for one camera frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorFrame {
    pub faces: Vec<FaceDetection>,
    /// Milliseconds since the start of the stream, when the detector supplies it
    pub timestamp_ms: Option<u64>,
}

impl DetectorFrame {
    /// Parse one JSON line
    ///
    /// Faces with an empty emotion distribution are dropped.
    ///
    /// # Errors
    ///
    /// Returns error if the line is not a valid frame object
    pub fn from_json(line: &str) -> Result<Self> {
        let wire: WireFrame = serde_json::from_str(line)?;
        Ok(Self {
            faces: wire.faces.into_iter().filter_map(WireFace::into_detection).collect(),
            timestamp_ms: wire.timestamp_ms,
        })
    }

    /// The face with the largest bounding box, first one on ties
    #[must_use]
    pub fn largest_face(&self) -> Option<&FaceDetection> {
        self.faces.iter().fold(None, |best, face| match best {
            Some(b) if b.bbox.area() >= face.bbox.area() => Some(b),
            _ => Some(face),
        })
    }
}

/// Label with the highest score; ties go to the alphabetically first label
///
/// `NaN` scores are ignored.
#[must_use]
pub fn dominant_emotion(scores: &BTreeMap<String, f32>) -> Option<(&str, f32)> {
    scores
        .iter()
        .filter(|(_, score)| !score.is_nan())
        .fold(None, |best, (label, &score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((label.as_str(), score)),
        })
}

#[derive(Debug, Deserialize)]
struct WireFrame {
    #[serde(default)]
    faces: Vec<WireFace>,
    #[serde(default)]
    timestamp_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireFace {
    #[serde(rename = "box")]
    bbox: BoundingBox,
    #[serde(flatten)]
    scores: WireScores,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireScores {
    Distribution { emotions: BTreeMap<String, f32> },
    Labeled { label: String, confidence: f32 },
}

impl WireFace {
    fn into_detection(self) -> Option<FaceDetection> {
        let (label, confidence) = match self.scores {
            WireScores::Distribution { emotions } => {
                let (label, confidence) = dominant_emotion(&emotions)?;
                (label.to_string(), confidence)
            }
            WireScores::Labeled { label, confidence } => (label, confidence),
        };

        // Scores outside [0, 1] are clamped; NaN stays NaN and is gated out
        Some(FaceDetection {
            bbox: self.bbox,
            label,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_distribution() {
        let frame = DetectorFrame::from_json(
            r#"{"faces":[{"box":[10,20,100,120],"emotions":{"angry":0.1,"happy":0.7,"sad":0.2}}]}"#,
        )
        .unwrap();

        assert_eq!(frame.faces.len(), 1);
        let face = &frame.faces[0];
        assert_eq!(face.label, "happy");
        assert!((face.confidence - 0.7).abs() < f32::EPSILON);
        assert_eq!(face.bbox.area(), 12_000);
        assert!(frame.timestamp_ms.is_none());
    }

    #[test]
    fn test_parse_labeled_face() {
        let frame = DetectorFrame::from_json(
            r#"{"faces":[{"box":[0,0,10,10],"label":"fear","confidence":0.42}],"timestamp_ms":500}"#,
        )
        .unwrap();

        assert_eq!(frame.faces[0].label, "fear");
        assert_eq!(frame.timestamp_ms, Some(500));
    }

    #[test]
    fn test_out_of_range_confidence_clamped() {
        let frame = DetectorFrame::from_json(
            r#"{"faces":[
                {"box":[0,0,10,10],"label":"happy","confidence":1.7},
                {"box":[0,0,5,5],"emotions":{"sad":-0.2}}
            ]}"#,
        )
        .unwrap();

        assert!((frame.faces[0].confidence - 1.0).abs() < f32::EPSILON);
        assert!(frame.faces[1].confidence.abs() < f32::EPSILON);
    }

    #[test]
    fn test_no_faces() {
        let frame = DetectorFrame::from_json(r#"{"faces":[]}"#).unwrap();
        assert!(frame.largest_face().is_none());

        let frame = DetectorFrame::from_json("{}").unwrap();
        assert!(frame.faces.is_empty());
    }

    #[test]
    fn test_empty_distribution_dropped() {
        let frame = DetectorFrame::from_json(r#"{"faces":[{"box":[0,0,5,5],"emotions":{}}]}"#)
            .unwrap();
        assert!(frame.faces.is_empty());
    }

    #[test]
    fn test_malformed_line_is_error() {
        assert!(DetectorFrame::from_json("not json").is_err());
        assert!(DetectorFrame::from_json(r#"{"faces":[{"box":[1,2,3]}]}"#).is_err());
    }

    #[test]
    fn test_largest_face_wins() {
        let frame = DetectorFrame::from_json(
            r#"{"faces":[
                {"box":[0,0,10,10],"label":"sad","confidence":0.9},
                {"box":[50,50,40,40],"label":"happy","confidence":0.5},
                {"box":[0,0,20,20],"label":"angry","confidence":0.8}
            ]}"#,
        )
        .unwrap();
        assert_eq!(frame.largest_face().unwrap().label, "happy");
    }

    #[test]
    fn test_largest_face_tie_keeps_first() {
        let frame = DetectorFrame::from_json(
            r#"{"faces":[
                {"box":[0,0,10,20],"label":"sad","confidence":0.9},
                {"box":[0,0,20,10],"label":"happy","confidence":0.9}
            ]}"#,
        )
        .unwrap();
        assert_eq!(frame.largest_face().unwrap().label, "sad");
    }

    #[test]
    fn test_dominant_tie_is_alphabetical() {
        let scores: BTreeMap<String, f32> =
            [("sad".to_string(), 0.4), ("happy".to_string(), 0.4)].into_iter().collect();
        assert_eq!(dominant_emotion(&scores).unwrap().0, "happy");
    }

    #[test]
    fn test_dominant_ignores_nan() {
        let scores: BTreeMap<String, f32> =
            [("angry".to_string(), f32::NAN), ("sad".to_string(), 0.1)].into_iter().collect();
        assert_eq!(dominant_emotion(&scores), Some(("sad", 0.1)));
    }
}
