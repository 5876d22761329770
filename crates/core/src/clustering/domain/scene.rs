use crate::clustering::domain::cluster_error::{ensure_same_dimension, ClusterError};
use crate::clustering::domain::dbscan::{group_by_label, Dbscan};
use crate::clustering::domain::vector_math::cosine_distance;
use crate::features::domain::photo_record::PhotoRecord;

pub const DEFAULT_SCENE_SIMILARITY: f64 = 0.85;
pub const DEFAULT_SCENE_MIN_SAMPLES: usize = 2;

/// Groups photos whose scene embeddings are within cosine distance
/// `1 - similarity_threshold`. Records without an embedding are ignored;
/// fewer than two embedded records yield no clusters.
pub fn cluster_scenes(
    records: &[PhotoRecord],
    similarity_threshold: f64,
    min_samples: usize,
) -> Result<Vec<Vec<String>>, ClusterError> {
    let embedded: Vec<&PhotoRecord> = records
        .iter()
        .filter(|r| !r.image_embedding.is_empty())
        .collect();
    if embedded.len() < 2 {
        return Ok(Vec::new());
    }
    ensure_same_dimension(embedded.iter().map(|r| r.image_embedding.as_slice()))?;

    let eps = 1.0 - similarity_threshold;
    let labels = Dbscan::new(eps, min_samples).fit(&embedded, |a, b| {
        cosine_distance(&a.image_embedding, &b.image_embedding)
    });

    Ok(group_by_label(&labels)
        .into_iter()
        .map(|members| {
            members
                .into_iter()
                .map(|idx| embedded[idx].filename.clone())
                .collect()
        })
        .collect())
}
