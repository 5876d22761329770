use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clustering::cluster_engine::ClusterConfig;
use crate::cropping::domain::aspect_ratio::AspectRatio;
use crate::features::feature_extractor::ExtractionSettings;
use crate::shared::constants::{
    DEFAULT_ASPECT_RATIOS, DEFAULT_BATCH_SIZE, DEFAULT_FACE_CONFIDENCE, DEFAULT_HEADROOM_RATIO,
    DEFAULT_PERSON_CONFIDENCE, MONOCHROME_SATURATION_THRESHOLD,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Every tunable of a run. Missing JSON fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Photos extracted between two checkpoint writes.
    pub batch_size: usize,
    pub aspect_ratios: Vec<AspectRatio>,
    /// Fraction of crop height reserved above the subject.
    pub headroom_ratio: f64,
    pub person_confidence_threshold: f64,
    pub monochrome_saturation_threshold: f64,
    /// Extraction threads; 1 runs sequentially on the calling thread.
    pub workers: usize,
    /// Per-photo extraction limit. A photo exceeding it fails and is
    /// retried on the next resumed run.
    pub photo_timeout_secs: Option<f64>,
    pub skip_clustering: bool,
    pub clustering: ClusterConfig,
    pub models: ModelConfig,
}

/// ONNX model files for the model-backed collaborators. An unset path
/// leaves that feature empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// YOLO face model (box, score and optional landmarks per row).
    pub face_detector: Option<PathBuf>,
    pub face_confidence_threshold: f64,
    /// YOLO COCO model; only the "person" class is read.
    pub person_detector: Option<PathBuf>,
    /// ArcFace-style 112x112 identity model.
    pub face_encoder: Option<PathBuf>,
    /// CLIP-style 224x224 image encoder.
    pub scene_embedder: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_detector: None,
            face_confidence_threshold: DEFAULT_FACE_CONFIDENCE,
            person_detector: None,
            face_encoder: None,
            scene_embedder: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            aspect_ratios: default_aspect_ratios(),
            headroom_ratio: DEFAULT_HEADROOM_RATIO,
            person_confidence_threshold: DEFAULT_PERSON_CONFIDENCE,
            monochrome_saturation_threshold: MONOCHROME_SATURATION_THRESHOLD,
            workers: 1,
            photo_timeout_secs: None,
            skip_clustering: false,
            clustering: ClusterConfig::default(),
            models: ModelConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.aspect_ratios.is_empty() {
            return Err(ConfigError::Invalid("aspect_ratios must not be empty".into()));
        }
        if !(0.0..1.0).contains(&self.headroom_ratio) {
            return Err(ConfigError::Invalid(format!(
                "headroom_ratio must be in [0, 1), got {}",
                self.headroom_ratio
            )));
        }
        if let Some(secs) = self.photo_timeout_secs {
            if !(secs > 0.0 && Duration::try_from_secs_f64(secs).is_ok()) {
                return Err(ConfigError::Invalid(format!(
                    "photo_timeout_secs must be a positive duration, got {secs}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.models.face_confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "models.face_confidence_threshold must be in [0, 1], got {}",
                self.models.face_confidence_threshold
            )));
        }
        Ok(())
    }

    pub fn extraction_settings(&self) -> ExtractionSettings {
        ExtractionSettings {
            aspect_ratios: self.aspect_ratios.clone(),
            headroom_ratio: self.headroom_ratio,
            person_confidence_threshold: self.person_confidence_threshold,
            monochrome_saturation_threshold: self.monochrome_saturation_threshold,
        }
    }

    pub fn photo_timeout(&self) -> Option<Duration> {
        self.photo_timeout_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .filter(|timeout| !timeout.is_zero())
    }
}

/// 4:5, 16:9 and 1:1.
pub fn default_aspect_ratios() -> Vec<AspectRatio> {
    DEFAULT_ASPECT_RATIOS
        .iter()
        .filter_map(|key| key.parse().ok())
        .collect()
}
