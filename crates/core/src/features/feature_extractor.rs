use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;

use crate::cropping::domain::aspect_ratio::AspectRatio;
use crate::cropping::domain::smart_crop::SmartCropSolver;
use crate::detection::domain::detection::{Detection, FaceEncoding};
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_encoder::{FaceEmbedding, FaceEncoder};
use crate::detection::domain::person_detector::PersonDetector;
use crate::features::domain::image_inspector::ImageInspector;
use crate::features::domain::monochrome;
use crate::features::domain::perceptual_hasher::PerceptualHasher;
use crate::features::domain::photo_record::PhotoRecord;
use crate::features::domain::scene_embedder::SceneEmbedder;
use crate::shared::constants::{
    DEFAULT_HEADROOM_RATIO, DEFAULT_PERSON_CONFIDENCE, GROUP_SHOT_FACE_COUNT,
    MONOCHROME_SATURATION_THRESHOLD,
};
use crate::shared::BoxError;

/// A recoverable failure for one photo. The photo is skipped and retried on
/// the next resumed run.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("{stage} failed for {path}: {source}")]
    Stage {
        stage: &'static str,
        path: PathBuf,
        #[source]
        source: BoxError,
    },
    #[error("extraction timed out after {seconds:.1}s for {path}")]
    Timeout { path: PathBuf, seconds: f64 },
    #[error("worker stopped before finishing {path}")]
    WorkerLost { path: PathBuf },
}

/// How long one extraction stage took.
#[derive(Clone, Debug, PartialEq)]
pub struct StageTiming {
    pub stage: &'static str,
    pub duration_ms: f64,
}

/// A record plus the per-stage timings spent building it.
#[derive(Clone, Debug)]
pub struct ExtractedPhoto {
    pub record: PhotoRecord,
    pub timings: Vec<StageTiming>,
}

/// Tunables for a [`FeatureExtractor`].
#[derive(Clone, Debug)]
pub struct ExtractionSettings {
    pub aspect_ratios: Vec<AspectRatio>,
    pub headroom_ratio: f64,
    pub person_confidence_threshold: f64,
    pub monochrome_saturation_threshold: f64,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            aspect_ratios: crate::pipeline::pipeline_config::default_aspect_ratios(),
            headroom_ratio: DEFAULT_HEADROOM_RATIO,
            person_confidence_threshold: DEFAULT_PERSON_CONFIDENCE,
            monochrome_saturation_threshold: MONOCHROME_SATURATION_THRESHOLD,
        }
    }
}

/// Builds one [`PhotoRecord`] per photo from injected collaborators.
///
/// Model-backed collaborators are optional. An absent one contributes an
/// empty result, and so does one that returns an error (logged at `warn`).
/// Only the image probe and the hasher can fail a photo.
pub struct FeatureExtractor {
    inspector: Box<dyn ImageInspector>,
    hasher: Box<dyn PerceptualHasher>,
    face_detector: Option<Box<dyn FaceDetector>>,
    person_detector: Option<Box<dyn PersonDetector>>,
    face_encoder: Option<Box<dyn FaceEncoder>>,
    scene_embedder: Option<Box<dyn SceneEmbedder>>,
    solver: SmartCropSolver,
    settings: ExtractionSettings,
}

impl FeatureExtractor {
    pub fn new(
        inspector: Box<dyn ImageInspector>,
        hasher: Box<dyn PerceptualHasher>,
        settings: ExtractionSettings,
    ) -> Self {
        Self {
            inspector,
            hasher,
            face_detector: None,
            person_detector: None,
            face_encoder: None,
            scene_embedder: None,
            solver: SmartCropSolver::new(settings.headroom_ratio),
            settings,
        }
    }

    pub fn with_face_detector(mut self, detector: Box<dyn FaceDetector>) -> Self {
        self.face_detector = Some(detector);
        self
    }

    pub fn with_person_detector(mut self, detector: Box<dyn PersonDetector>) -> Self {
        self.person_detector = Some(detector);
        self
    }

    pub fn with_face_encoder(mut self, encoder: Box<dyn FaceEncoder>) -> Self {
        self.face_encoder = Some(encoder);
        self
    }

    pub fn with_scene_embedder(mut self, embedder: Box<dyn SceneEmbedder>) -> Self {
        self.scene_embedder = Some(embedder);
        self
    }

    pub fn settings(&self) -> &ExtractionSettings {
        &self.settings
    }

    pub fn extract(&self, path: &Path) -> Result<ExtractedPhoto, ExtractionError> {
        let mut timings = Vec::new();
        let stage_err = |stage: &'static str| {
            move |source: BoxError| ExtractionError::Stage {
                stage,
                path: path.to_path_buf(),
                source,
            }
        };

        let (width, height) = timed(&mut timings, "dimensions", || {
            self.inspector.dimensions(path)
        })
        .map_err(|source| ExtractionError::Image {
            path: path.to_path_buf(),
            source,
        })?;

        let faces = match &self.face_detector {
            Some(detector) => {
                let found = timed(&mut timings, "face_detection", || detector.detect(path));
                or_empty(path, "face_detection", found)
            }
            None => Vec::new(),
        };

        let persons = match &self.person_detector {
            Some(detector) if needs_person_detection(faces.len()) => {
                let threshold = self.settings.person_confidence_threshold;
                let found = timed(&mut timings, "person_detection", || {
                    detector.detect(path, threshold)
                });
                or_empty(path, "person_detection", found)
            }
            _ => Vec::new(),
        };

        let hashes = timed(&mut timings, "hashing", || self.hasher.hash(path))
            .map_err(stage_err("hashing"))?;

        let image_embedding = match &self.scene_embedder {
            Some(embedder) => {
                let embedded = timed(&mut timings, "scene_embedding", || embedder.embed(path));
                or_empty(path, "scene_embedding", embedded)
            }
            None => Vec::new(),
        };

        let face_encodings = match &self.face_encoder {
            Some(encoder) if !faces.is_empty() => {
                let locations: Vec<_> = faces.iter().map(|f| f.bbox).collect();
                let embeddings = timed(&mut timings, "face_encoding", || {
                    encoder.encode(path, &locations)
                });
                join_encodings(path, &faces, or_empty(path, "face_encoding", embeddings))
            }
            _ => Vec::new(),
        };

        let crop_started = Instant::now();
        let crops: BTreeMap<String, _> = self
            .settings
            .aspect_ratios
            .iter()
            .map(|&ratio| {
                let crop = self.solver.solve(ratio, &faces, &persons, width, height);
                (ratio.key(), crop)
            })
            .collect();
        timings.push(StageTiming {
            stage: "cropping",
            duration_ms: elapsed_ms(crop_started),
        });

        let saturation = timed(&mut timings, "monochrome", || {
            self.inspector.average_saturation(path)
        })
        .map_err(stage_err("monochrome"))?;
        let is_monochrome =
            monochrome::is_monochrome(saturation, self.settings.monochrome_saturation_threshold);

        let record = PhotoRecord {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            filepath: path.to_string_lossy().into_owned(),
            width,
            height,
            hashes,
            image_embedding,
            faces,
            face_encodings,
            persons,
            crops,
            is_monochrome,
        };

        Ok(ExtractedPhoto { record, timings })
    }
}

/// A model stage that errors degrades to its empty result.
fn or_empty<T: Default>(path: &Path, stage: &str, result: Result<T, BoxError>) -> T {
    result.unwrap_or_else(|e| {
        log::warn!("{stage} failed for {}, continuing without it: {e}", path.display());
        T::default()
    })
}

/// Group-shot heuristic: persons help when there are no faces to frame, or
/// too many faces for face framing alone.
fn needs_person_detection(face_count: usize) -> bool {
    face_count == 0 || face_count > GROUP_SHOT_FACE_COUNT
}

/// Pairs each detection with the embedding computed for its box. Output
/// follows detection order; faces without an embedding are dropped.
fn join_encodings(
    path: &Path,
    faces: &[Detection],
    embeddings: Vec<FaceEmbedding>,
) -> Vec<FaceEncoding> {
    let mut pending: Vec<Option<FaceEmbedding>> = embeddings.into_iter().map(Some).collect();
    let mut joined = Vec::with_capacity(faces.len());

    for face in faces {
        let matched = pending
            .iter_mut()
            .find(|slot| matches!(slot, Some(e) if e.location == face.bbox))
            .and_then(Option::take);
        match matched {
            Some(embedding) => joined.push(FaceEncoding::for_detection(face, embedding.embedding)),
            None => log::debug!("No encoding for face {:?} in {}", face.bbox, path.display()),
        }
    }

    let orphans = pending.iter().flatten().count();
    if orphans > 0 {
        log::warn!(
            "Discarded {orphans} face encoding(s) with no matching detection in {}",
            path.display()
        );
    }

    joined
}

fn timed<T>(timings: &mut Vec<StageTiming>, stage: &'static str, f: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let result = f();
    timings.push(StageTiming {
        stage,
        duration_ms: elapsed_ms(started),
    });
    result
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
