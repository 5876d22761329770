use serde::{Deserialize, Serialize};

use crate::shared::bounding_box::BoundingBox;

/// A face or person found in a photo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub quality_score: f64,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f64, quality_score: f64) -> Self {
        Self {
            bbox,
            confidence,
            quality_score,
        }
    }

    /// Ranking used to pick a crop subject.
    pub fn subject_score(&self) -> f64 {
        self.confidence * self.quality_score
    }

    /// Highest `confidence * quality_score`; the first wins ties.
    pub fn best(detections: &[Detection]) -> Option<&Detection> {
        detections.iter().fold(None, |best: Option<&Detection>, d| match best {
            Some(b) if b.subject_score() >= d.subject_score() => Some(b),
            _ => Some(d),
        })
    }
}

/// Identity embedding for one detected face.
///
/// Carries the box of the detection it was computed from, so the pairing
/// with `PhotoRecord::faces` survives any reordering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceEncoding {
    pub embedding: Vec<f32>,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub quality_score: f64,
}

impl FaceEncoding {
    pub fn for_detection(detection: &Detection, embedding: Vec<f32>) -> Self {
        Self {
            embedding,
            bbox: detection.bbox,
            confidence: detection.confidence,
            quality_score: detection.quality_score,
        }
    }
}
