use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cropping::domain::crop_result::CropResult;
use crate::detection::domain::detection::{Detection, FaceEncoding};

/// 64-bit perceptual hashes, hex encoded.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoHashes {
    pub phash: String,
    pub dhash: String,
}

/// Every feature extracted for one photo. Built once, never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub filename: String,
    pub filepath: String,
    pub width: u32,
    pub height: u32,
    pub hashes: PhotoHashes,
    /// Scene embedding; empty when no embedder is available.
    #[serde(default)]
    pub image_embedding: Vec<f32>,
    #[serde(default)]
    pub faces: Vec<Detection>,
    #[serde(default)]
    pub face_encodings: Vec<FaceEncoding>,
    #[serde(default)]
    pub persons: Vec<Detection>,
    /// Crop per aspect-ratio key (e.g. `"4:5"`).
    #[serde(default)]
    pub crops: BTreeMap<String, CropResult>,
    #[serde(default)]
    pub is_monochrome: bool,
}
