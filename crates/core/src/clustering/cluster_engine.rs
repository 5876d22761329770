use serde::{Deserialize, Serialize};

use crate::clustering::domain::cluster_error::ClusterError;
use crate::clustering::domain::cluster_report::{ClusterReport, PhotoGroup};
use crate::clustering::domain::near_duplicate::{cluster_near_duplicates, DEFAULT_HASH_THRESHOLD};
use crate::clustering::domain::people::cluster_people;
use crate::clustering::domain::scene::{
    cluster_scenes, DEFAULT_SCENE_MIN_SAMPLES, DEFAULT_SCENE_SIMILARITY,
};
use crate::clustering::domain::vector_math::DEFAULT_FACE_TOLERANCE;
use crate::features::domain::photo_record::PhotoRecord;

/// Thresholds for the three clustering passes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Maximum pHash/dHash Hamming distance for near-duplicates.
    pub hash_threshold: u32,
    /// Minimum cosine similarity for photos of one scene.
    pub scene_similarity_threshold: f64,
    pub scene_min_samples: usize,
    /// Maximum Euclidean distance between faces of one person.
    pub face_distance_threshold: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            hash_threshold: DEFAULT_HASH_THRESHOLD,
            scene_similarity_threshold: DEFAULT_SCENE_SIMILARITY,
            scene_min_samples: DEFAULT_SCENE_MIN_SAMPLES,
            face_distance_threshold: DEFAULT_FACE_TOLERANCE,
        }
    }
}

/// Runs the near-duplicate, scene and people passes over the full record
/// set. A failing pass contributes an empty list and the others still run.
pub struct ClusterEngine {
    config: ClusterConfig,
}

impl ClusterEngine {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, records: &[PhotoRecord]) -> ClusterReport {
        let near_duplicates = cluster_near_duplicates(records, self.config.hash_threshold);

        let scenes = contained(
            "scene",
            cluster_scenes(
                records,
                self.config.scene_similarity_threshold,
                self.config.scene_min_samples,
            ),
        );

        let people = contained(
            "people",
            cluster_people(records, self.config.face_distance_threshold),
        );

        log::info!(
            "Clustered {} photos: {} near-duplicate groups, {} scenes, {} people",
            records.len(),
            near_duplicates.len(),
            scenes.len(),
            people.len()
        );

        ClusterReport {
            near_duplicates: PhotoGroup::numbered(near_duplicates),
            scenes: PhotoGroup::numbered(scenes),
            people,
        }
    }
}

fn contained<T>(pass: &str, result: Result<Vec<T>, ClusterError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        log::warn!("{pass} clustering failed, skipping: {e}");
        Vec::new()
    })
}
